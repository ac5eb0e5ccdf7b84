// GOES Loop - file_manager.rs

use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// The local directory tiles are written into.
#[derive(Debug, Clone)]
pub struct FileManager {
    dir: PathBuf,
}

impl FileManager {
    /// Creates `dir` (and parents) if it is missing. An existing directory is fine.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(FileManager { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Opens `filename` for writing, truncating whatever a previous run left there.
    pub async fn create(&self, filename: &str) -> Result<TileFile, std::io::Error> {
        let path = self.path_for(filename);
        let file = File::create(&path).await?;
        Ok(TileFile {
            file,
            path,
            written: 0,
        })
    }
}

/// A tile being written to disk.
#[derive(Debug)]
pub struct TileFile {
    file: File,
    path: PathBuf,
    written: u64,
}

impl TileFile {
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flushes and closes the file, returning the number of bytes written.
    pub async fn finish(mut self) -> Result<u64, std::io::Error> {
        self.file.flush().await?;
        Ok(self.written)
    }

    /// Closes and removes a partially written tile.
    pub async fn discard(self) {
        let TileFile { mut file, path, .. } = self;
        // Let any in-flight write settle so the handle is really closed before removal.
        file.flush().await.ok();
        drop(file);
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial tile");
        }
    }
}
