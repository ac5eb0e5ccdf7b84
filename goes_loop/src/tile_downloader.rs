// GOES Loop - tile_downloader.rs

use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

use crate::file_manager::{FileManager, TileFile};

/// Why a single tile was skipped. Never fatal for the run.
#[derive(Error, Debug)]
pub enum TileError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server returned an unsuccessful status code: {0}")]
    Unsuccessful(StatusCode),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches one tile at a time over a shared client.
#[derive(Clone)]
pub struct TileDownloader {
    client: Client,
}

impl TileDownloader {
    pub fn new() -> Self {
        TileDownloader {
            client: Client::new(),
        }
    }

    /// Downloads `url` into `filename` under `files`, returning the number of bytes saved.
    ///
    /// Nothing is created locally unless the server answers with a success
    /// status. If the body stream breaks halfway, the partial file is removed.
    /// The response is consumed and dropped before this returns, so the
    /// connection is released on every path.
    pub async fn download_tile(
        &self,
        url: &str,
        files: &FileManager,
        filename: &str,
    ) -> Result<u64, TileError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TileError::Unsuccessful(response.status()));
        }

        let mut tile = files.create(filename).await?;
        match copy_body(response, &mut tile).await {
            Ok(()) => Ok(tile.finish().await?),
            Err(e) => {
                tile.discard().await;
                Err(e)
            }
        }
    }
}

impl Default for TileDownloader {
    fn default() -> Self {
        Self::new()
    }
}

async fn copy_body(mut response: Response, tile: &mut TileFile) -> Result<(), TileError> {
    while let Some(chunk) = response.chunk().await? {
        tile.write_chunk(&chunk).await?;
    }
    Ok(())
}
