// GOES Loop - src/bin/main.rs
//
// Entry point. With no subcommand it downloads the tile range into `files/`
// and then stitches whatever landed there into `output.gif`.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use goes_loop::animator::{Animator, DEFAULT_OUTPUT};
use goes_loop::fetch_manager::{FetchConfig, FetchManager, DEFAULT_TILE_DIR};

/// Downloads a week of GOES-18 full-disk GeoColor tiles and turns them into an animated GIF.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Only download tiles into `files/`.
    Fetch,
    /// Only build `output.gif` from the tiles already in `files/`.
    Animate,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("goes_loop=info")),
        )
        .init();

    let args = Args::parse();

    if args.command != Some(Command::Animate) {
        fetch().await;
    }
    if args.command != Some(Command::Fetch) {
        animate().await;
    }
}

async fn fetch() {
    let manager = match FetchManager::new(FetchConfig::default(), DEFAULT_TILE_DIR) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Fetch setup error: {}", e);
            return;
        }
    };

    match manager.run().await {
        Ok(report) => println!(
            "Downloaded {} tiles into {}/ ({} skipped)",
            report.saved(),
            DEFAULT_TILE_DIR,
            report.skipped()
        ),
        Err(e) => eprintln!("Download error: {}", e),
    }
}

async fn animate() {
    let animator = Animator::new(DEFAULT_TILE_DIR, DEFAULT_OUTPUT);

    // Decoding and dithering are CPU bound; keep them off the async workers.
    match tokio::task::spawn_blocking(move || animator.run()).await {
        Ok(Ok(report)) => println!(
            "GIF saved as {} ({} frames, {} skipped)",
            report.output.display(),
            report.frames,
            report.skipped.len()
        ),
        Ok(Err(e)) => eprintln!("GIF creation error: {}", e),
        Err(e) => eprintln!("GIF creation task failed: {}", e),
    }
}
