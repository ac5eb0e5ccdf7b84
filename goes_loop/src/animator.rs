// GOES Loop - animator.rs

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::palette::{quantize, PalettedFrame, Plan9Palette};
use crate::progress_bar;
use crate::tile::TILE_EXTENSION;

/// Where the binary writes the animation.
pub const DEFAULT_OUTPUT: &str = "output.gif";

/// Run-level failures. Per-file problems never end up here.
#[derive(Error, Debug)]
pub enum AnimateError {
    #[error("Could not read tile directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No .jpg images found in {path:?}")]
    NoImages { path: PathBuf },
    #[error("None of the {candidates} images in {path:?} could be decoded")]
    NoFrames { path: PathBuf, candidates: usize },
    #[error("Could not create {path:?}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("GIF encoding failed: {0}")]
    Encode(#[from] gif::EncodingError),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why one file contributed no frame.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("{width}x{height} exceeds the GIF size limit")]
    TooLarge { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AnimationReport {
    pub output: PathBuf,
    pub frames: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Builds one animated GIF out of the tiles in a directory.
pub struct Animator {
    source_dir: PathBuf,
    output: PathBuf,
    palette: Plan9Palette,
}

impl Animator {
    pub fn new(source_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output: output.into(),
            palette: Plan9Palette::new(),
        }
    }

    /// Converts every decodable tile, in filename order, and writes the GIF.
    ///
    /// The output file is only created once at least one frame exists, so an
    /// empty or fully corrupt directory leaves any previous output untouched.
    pub fn run(&self) -> Result<AnimationReport, AnimateError> {
        let names = self.scan()?;
        if names.is_empty() {
            return Err(AnimateError::NoImages {
                path: self.source_dir.clone(),
            });
        }

        let pb = progress_bar(names.len() as u64);
        let mut frames = Vec::with_capacity(names.len());
        let mut skipped = Vec::new();

        for name in &names {
            pb.set_message(name.clone());
            match self.convert(name) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    pb.suspend(|| warn!(file = %name, error = %e, "skipping image"));
                    skipped.push(SkippedFile {
                        name: name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if frames.is_empty() {
            return Err(AnimateError::NoFrames {
                path: self.source_dir.clone(),
                candidates: names.len(),
            });
        }

        info!(frames = frames.len(), "encoding GIF");
        self.encode(&frames)?;
        info!(output = %self.output.display(), "GIF saved");

        Ok(AnimationReport {
            output: self.output.clone(),
            frames: frames.len(),
            skipped,
        })
    }

    /// Names of the regular `.jpg` entries in the source directory, sorted as plain strings.
    pub fn scan(&self) -> Result<Vec<String>, AnimateError> {
        let read_err = |source: std::io::Error| AnimateError::ReadDir {
            path: self.source_dir.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.source_dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            if entry.file_type().map_err(read_err)?.is_dir() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TILE_EXTENSION) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "ignoring non UTF-8 file name"),
            }
        }

        names.sort();
        Ok(names)
    }

    fn convert(&self, name: &str) -> Result<PalettedFrame, FrameError> {
        let bytes = fs::read(self.source_dir.join(name))?;
        let image = image::load_from_memory(&bytes)?;

        let (width, height) = (image.width(), image.height());
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(FrameError::TooLarge { width, height });
        }

        Ok(quantize(&image, &self.palette))
    }

    // Frames arrive here already bounded to u16 by `convert`.
    fn encode(&self, frames: &[PalettedFrame]) -> Result<(), AnimateError> {
        let screen_width = frames.iter().map(|f| f.width).max().unwrap_or(0) as u16;
        let screen_height = frames.iter().map(|f| f.height).max().unwrap_or(0) as u16;

        let file = create_output(&self.output)?;
        let mut encoder = gif::Encoder::new(
            BufWriter::new(file),
            screen_width,
            screen_height,
            &self.palette.color_table(),
        )?;
        encoder.set_repeat(gif::Repeat::Infinite)?;

        for frame in frames {
            encoder.write_frame(&gif::Frame {
                width: frame.width as u16,
                height: frame.height as u16,
                delay: frame.delay,
                buffer: Cow::Borrowed(&frame.indices[..]),
                ..gif::Frame::default()
            })?;
        }

        encoder.into_inner()?.flush()?;
        Ok(())
    }
}

fn create_output(path: &Path) -> Result<File, AnimateError> {
    File::create(path).map_err(|source| AnimateError::CreateOutput {
        path: path.to_path_buf(),
        source,
    })
}
