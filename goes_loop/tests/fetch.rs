use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream;

use goes_loop::fetch_manager::{manifest_path, FetchConfig, FetchError, FetchManager};
use goes_loop::file_manager::FileManager;
use goes_loop::tile::{FetchReport, TileState, DAY_COUNT, HOURS_PER_DAY};
use goes_loop::tile_downloader::TileDownloader;

const SUFFIX: &str = "_TEST.jpg";
const FIRST_TILE: &str = "20251910000_TEST.jpg";
const MISSING_TILE: &str = "20251910010_TEST.jpg";
/// Served with a body that breaks off before the advertised length.
const BROKEN_TILE: &str = "20251910020_TEST.jpg";
const LAST_TILE: &str = "20251982350_TEST.jpg";
const TOTAL_TILES: usize = (DAY_COUNT * HOURS_PER_DAY * 6) as usize;

fn tile_body(name: &str) -> Vec<u8> {
    format!("bytes of {name}").into_bytes()
}

fn cut_off_body() -> Response {
    let chunks = stream::iter(vec![
        Ok(b"partial jpeg".to_vec()),
        Err(std::io::Error::other("connection cut")),
    ]);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, "4096")
        .body(Body::from_stream(chunks))
        .unwrap()
}

async fn serve_tile(Path(name): Path<String>) -> Response {
    if name == FIRST_TILE || name == LAST_TILE {
        (StatusCode::OK, tile_body(&name)).into_response()
    } else if name == BROKEN_TILE {
        cut_off_body()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn spawn_tile_server() -> SocketAddr {
    let app = Router::new().route("/tiles/:name", get(serve_tile));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(base_url: String) -> FetchConfig {
    FetchConfig {
        base_url,
        year_day: 2025191,
        filename_suffix: SUFFIX.to_string(),
    }
}

fn state_of<'a>(report: &'a FetchReport, filename: &str) -> &'a TileState {
    &report
        .tiles
        .iter()
        .find(|t| t.filename == filename)
        .unwrap()
        .state
}

#[tokio::test]
async fn saves_only_successful_tiles() {
    let addr = spawn_tile_server().await;
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("files");

    let manager = FetchManager::new(config_for(format!("http://{addr}/tiles/")), &dest).unwrap();
    let report = manager.run().await.unwrap();

    assert_eq!(report.tiles.len(), TOTAL_TILES);
    assert_eq!(report.saved(), 2);
    assert_eq!(report.skipped(), TOTAL_TILES - 2);

    assert_eq!(std::fs::read(dest.join(FIRST_TILE)).unwrap(), tile_body(FIRST_TILE));
    assert_eq!(std::fs::read(dest.join(LAST_TILE)).unwrap(), tile_body(LAST_TILE));

    let mut on_disk: Vec<String> = std::fs::read_dir(&dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, vec![FIRST_TILE, LAST_TILE]);

    let missing = report
        .tiles
        .iter()
        .find(|t| t.filename == MISSING_TILE)
        .unwrap();
    assert_eq!(missing.state, TileState::Unsuccessful { status: 404 });
    assert_eq!(missing.url, format!("http://{addr}/tiles/{MISSING_TILE}"));
}

#[tokio::test]
async fn broken_body_leaves_no_partial_tile() {
    let addr = spawn_tile_server().await;
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("files");

    let manager = FetchManager::new(config_for(format!("http://{addr}/tiles/")), &dest).unwrap();
    let report = manager.run().await.unwrap();

    assert!(matches!(state_of(&report, BROKEN_TILE), TileState::Failed { .. }));
    assert!(!dest.join(BROKEN_TILE).exists());
    // Tiles after the broken one are still fetched.
    assert_eq!(state_of(&report, LAST_TILE), &TileState::Saved {
        bytes: tile_body(LAST_TILE).len() as u64
    });
}

#[tokio::test]
async fn download_tile_reports_a_cut_off_stream() {
    let addr = spawn_tile_server().await;
    let root = tempfile::tempdir().unwrap();
    let files = FileManager::new(root.path().join("files")).await.unwrap();

    let result = TileDownloader::new()
        .download_tile(&format!("http://{addr}/tiles/{BROKEN_TILE}"), &files, BROKEN_TILE)
        .await;

    assert!(result.is_err());
    assert!(!files.path_for(BROKEN_TILE).exists());
}

#[tokio::test]
async fn file_creation_failure_skips_only_that_tile() {
    let addr = spawn_tile_server().await;
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("files");
    // A directory squatting on the tile name makes creating the file fail.
    std::fs::create_dir_all(dest.join(FIRST_TILE)).unwrap();

    let manager = FetchManager::new(config_for(format!("http://{addr}/tiles/")), &dest).unwrap();
    let report = manager.run().await.unwrap();

    assert!(matches!(state_of(&report, FIRST_TILE), TileState::Failed { .. }));
    assert!(dest.join(FIRST_TILE).is_dir());
    assert_eq!(report.saved(), 1);
    assert_eq!(std::fs::read(dest.join(LAST_TILE)).unwrap(), tile_body(LAST_TILE));
}

#[tokio::test]
async fn writes_a_manifest_beside_the_tiles() {
    let addr = spawn_tile_server().await;
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("files");

    let manager = FetchManager::new(config_for(format!("http://{addr}/tiles/")), &dest).unwrap();
    manager.run().await.unwrap();

    let manifest_file = manifest_path(&dest);
    assert_eq!(manifest_file, root.path().join("files.meta"));

    let manifest = FetchReport::load(&manifest_file).unwrap();
    assert_eq!(manifest.first_year_day, 2025191);
    assert_eq!(manifest.tiles.len(), TOTAL_TILES);
    assert_eq!(manifest.tiles[0].filename, FIRST_TILE);
    assert_eq!(
        manifest.tiles[0].state,
        TileState::Saved {
            bytes: tile_body(FIRST_TILE).len() as u64
        }
    );
}

#[tokio::test]
async fn keeps_existing_directory_and_overwrites_collisions() {
    let addr = spawn_tile_server().await;
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("files");
    std::fs::create_dir(&dest).unwrap();
    std::fs::write(dest.join(FIRST_TILE), b"stale").unwrap();
    std::fs::write(dest.join("older.jpg"), b"from a previous run").unwrap();

    let manager = FetchManager::new(config_for(format!("http://{addr}/tiles/")), &dest).unwrap();
    manager.run().await.unwrap();

    assert_eq!(std::fs::read(dest.join(FIRST_TILE)).unwrap(), tile_body(FIRST_TILE));
    assert!(dest.join("older.jpg").exists());
}

#[tokio::test]
async fn unreachable_server_skips_every_tile() {
    // Bind then drop to get a local port nothing listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let root = tempfile::tempdir().unwrap();
    let dest = root.path().join("files");

    let manager = FetchManager::new(config_for(format!("http://{addr}/")), &dest).unwrap();
    let report = manager.run().await.unwrap();

    assert_eq!(report.saved(), 0);
    assert!(report
        .tiles
        .iter()
        .all(|t| matches!(t.state, TileState::Failed { .. })));
    assert!(!dest.join(FIRST_TILE).exists());
}

#[tokio::test]
async fn directory_creation_failure_ends_the_run() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("files");
    std::fs::write(&blocker, b"a file, not a directory").unwrap();

    let manager = FetchManager::new(config_for("http://127.0.0.1:9/".to_string()), &blocker).unwrap();
    let err = manager.run().await.unwrap_err();
    assert!(matches!(err, FetchError::CreateDir { .. }));
}
