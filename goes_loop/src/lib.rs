// GOES Loop - lib.rs
//
// Two independent phases: `fetch_manager` fills a directory with tiles,
// `animator` turns whatever tiles that directory holds into one GIF.

pub mod animator;
pub mod fetch_manager;
pub mod file_manager;
pub mod palette;
pub mod tile;
pub mod tile_downloader;

use indicatif::{ProgressBar, ProgressStyle};

/// Percentage bar shared by both phases. Hidden automatically when stderr is not a terminal.
pub(crate) fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}
