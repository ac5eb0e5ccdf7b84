// GOES Loop - tile.rs

use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Consecutive days covered by one fetch run.
pub const DAY_COUNT: u32 = 8;
pub const HOURS_PER_DAY: u32 = 24;
/// Spacing between two captures inside an hour, in minutes.
pub const MINUTE_STEP: u32 = 10;
/// Extension of downloaded tiles. The animator only picks up files with exactly this extension.
pub const TILE_EXTENSION: &str = "jpg";

/// One remote tile, addressed by its capture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRef {
    /// Year followed by day-of-year, e.g. `2025191`.
    pub year_day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl TileRef {
    /// `<year_day><hour:02><minute:02><suffix>`.
    ///
    /// Hour and minute are zero padded so that sorting filenames as plain
    /// strings yields capture order.
    pub fn filename(&self, suffix: &str) -> String {
        format!("{}{:02}{:02}{}", self.year_day, self.hour, self.minute, suffix)
    }
}

/// Every tile slot of a run starting at `first_year_day`, day first, then hour, then minute.
pub fn tile_space(first_year_day: u32) -> impl Iterator<Item = TileRef> {
    iproduct!(
        0..DAY_COUNT,
        0..HOURS_PER_DAY,
        (0..60).step_by(MINUTE_STEP as usize)
    )
    .map(move |(day, hour, minute)| TileRef {
        year_day: first_year_day + day,
        hour,
        minute,
    })
}

/// Outcome of a single tile fetch attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "state")]
pub enum TileState {
    Saved { bytes: u64 },
    Unsuccessful { status: u16 },
    Failed { reason: String },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TileRecord {
    pub filename: String,
    pub url: String,
    pub state: TileState,
}

/// Everything a fetch run attempted. Serialized to `<tile dir>.meta` beside the tile directory.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FetchReport {
    pub base_url: String,
    pub first_year_day: u32,
    pub tiles: Vec<TileRecord>,
}

impl FetchReport {
    pub fn saved(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| matches!(t.state, TileState::Saved { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.tiles.len() - self.saved()
    }

    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
