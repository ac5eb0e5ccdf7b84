// GOES Loop - fetch_manager.rs

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::file_manager::FileManager;
use crate::progress_bar;
use crate::tile::{tile_space, FetchReport, TileRecord, TileRef, TileState};
use crate::tile_downloader::{TileDownloader, TileError};

pub const DEFAULT_BASE_URL: &str = "https://cdn.star.nesdis.noaa.gov/GOES18/ABI/FD/GEOCOLOR/";
pub const DEFAULT_YEAR_DAY: u32 = 2025191;
pub const DEFAULT_FILENAME_SUFFIX: &str = "_GOES18-ABI-FD-GEOCOLOR-678x678.jpg";
/// Directory the binary downloads into and animates from.
pub const DEFAULT_TILE_DIR: &str = "files";
/// Extension of the run summary written beside the tile directory.
pub const MANIFEST_EXTENSION: &str = "meta";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Could not create tile directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where tiles come from and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Prefix every filename is appended to. Normally ends with `/`.
    pub base_url: String,
    /// Year and day-of-year of the first day fetched, e.g. `2025191`.
    pub year_day: u32,
    /// Appended to every filename after the time fields.
    pub filename_suffix: String,
}

/// `files/` gets its summary at `files.meta`, so the tile directory only ever holds tiles.
pub fn manifest_path(dest_dir: &Path) -> PathBuf {
    match dest_dir.file_name() {
        Some(name) => {
            let mut file_name = name.to_os_string();
            file_name.push(".");
            file_name.push(MANIFEST_EXTENSION);
            dest_dir.with_file_name(file_name)
        }
        None => dest_dir.join(format!("fetch.{MANIFEST_EXTENSION}")),
    }
}

impl FetchConfig {
    pub fn tile_url(&self, filename: &str) -> String {
        format!("{}{}", self.base_url, filename)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            year_day: DEFAULT_YEAR_DAY,
            filename_suffix: DEFAULT_FILENAME_SUFFIX.to_string(),
        }
    }
}

/// Downloads the whole tile range, one request at a time.
pub struct FetchManager {
    config: FetchConfig,
    dest_dir: PathBuf,
    downloader: TileDownloader,
}

impl FetchManager {
    pub fn new(config: FetchConfig, dest_dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        Url::parse(&config.base_url).map_err(|source| FetchError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;

        Ok(Self {
            config,
            dest_dir: dest_dir.into(),
            downloader: TileDownloader::new(),
        })
    }

    /// Walks every tile slot in order. Failed tiles are logged and skipped;
    /// only failing to create the destination directory ends the run early.
    pub async fn run(&self) -> Result<FetchReport, FetchError> {
        let files = FileManager::new(&self.dest_dir)
            .await
            .map_err(|source| FetchError::CreateDir {
                path: self.dest_dir.clone(),
                source,
            })?;

        let tiles: Vec<TileRef> = tile_space(self.config.year_day).collect();
        let pb = progress_bar(tiles.len() as u64);

        let mut report = FetchReport {
            base_url: self.config.base_url.clone(),
            first_year_day: self.config.year_day,
            tiles: Vec::with_capacity(tiles.len()),
        };

        for tile in tiles {
            let filename = tile.filename(&self.config.filename_suffix);
            let url = self.config.tile_url(&filename);
            pb.set_message(filename.clone());
            debug!(%url, "downloading");

            let state = match self.downloader.download_tile(&url, &files, &filename).await {
                Ok(bytes) => {
                    debug!(path = %files.path_for(&filename).display(), bytes, "saved");
                    TileState::Saved { bytes }
                }
                Err(TileError::Unsuccessful(status)) => {
                    pb.suspend(|| warn!(%url, %status, "non-success response, skipping"));
                    TileState::Unsuccessful {
                        status: status.as_u16(),
                    }
                }
                Err(e) => {
                    pb.suspend(|| warn!(%url, error = %e, "skipping tile"));
                    TileState::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            report.tiles.push(TileRecord {
                filename,
                url,
                state,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();

        let manifest = manifest_path(&self.dest_dir);
        if let Err(e) = report.save(&manifest) {
            warn!(path = %manifest.display(), error = %e, "could not write fetch manifest");
        }

        info!(
            saved = report.saved(),
            skipped = report.skipped(),
            "fetch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_geocolor_full_disk() {
        let config = FetchConfig::default();
        let tile = TileRef {
            year_day: config.year_day,
            hour: 17,
            minute: 50,
        };
        assert_eq!(
            config.tile_url(&tile.filename(&config.filename_suffix)),
            "https://cdn.star.nesdis.noaa.gov/GOES18/ABI/FD/GEOCOLOR/20251911750_GOES18-ABI-FD-GEOCOLOR-678x678.jpg"
        );
    }

    #[test]
    fn manifest_sits_beside_the_tile_directory() {
        assert_eq!(manifest_path(Path::new("files")), PathBuf::from("files.meta"));
        assert_eq!(manifest_path(Path::new("files/")), PathBuf::from("files.meta"));
        assert_eq!(
            manifest_path(Path::new("/data/goes/files")),
            PathBuf::from("/data/goes/files.meta")
        );
        assert_eq!(manifest_path(Path::new("/")), PathBuf::from("/fetch.meta"));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let config = FetchConfig {
            base_url: "not a url".to_string(),
            ..FetchConfig::default()
        };
        let err = FetchManager::new(config, "files").err().unwrap();
        assert!(matches!(err, FetchError::InvalidBaseUrl { .. }));
    }
}
