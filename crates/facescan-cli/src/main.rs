use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{ArgGroup, Parser};
use facescan_core::{FaceDetector, FaceStore, Preview, ScanLog, Session, SessionOptions};
use facescan_hw::Camera;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod preview;
mod report;

use config::Config;
use input::StdinKeys;
use preview::{SnapshotPreview, PREVIEW_FILE_NAME};

/// Scan faces from a webcam, save the crops and keep a scan log.
///
/// Without a report flag, starts a live scanning session.
#[derive(Parser)]
#[command(
    name = "facescan",
    about = "Face scanner: detect faces from a webcam and keep a scan log"
)]
#[command(group(
    ArgGroup::new("report").args(["stats", "list_faces", "cleanup", "export", "prune_missing"])
))]
struct Cli {
    /// Directory to store face data [default: $FACESCAN_DATA_DIR or ./face_data]
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Detect faces but don't save them automatically ('s' still saves)
    #[arg(long)]
    no_save: bool,

    /// Don't write the live preview snapshot
    #[arg(long)]
    no_display: bool,

    /// Show scanning statistics
    #[arg(long)]
    stats: bool,

    /// List all scanned faces
    #[arg(long)]
    list_faces: bool,

    /// Delete faces older than N days
    #[arg(long, value_name = "DAYS")]
    cleanup: Option<u32>,

    /// Export the scan log to CSV [default file: scan_log_<timestamp>.csv]
    #[arg(long, value_name = "FILE")]
    export: Option<Option<PathBuf>>,

    /// Drop log entries whose image file no longer exists
    #[arg(long)]
    prune_missing: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
    let log = ScanLog::in_data_dir(&data_dir);

    if cli.stats {
        let stats = log.statistics().context("failed to read scan log")?;
        let faces_dir = FaceStore::in_data_dir(&data_dir);
        print!("{}", report::render_stats(&stats, faces_dir.dir(), log.path()));
    } else if cli.list_faces {
        let records = log.list().context("failed to read scan log")?;
        print!("{}", report::render_faces(&records));
    } else if let Some(days) = cli.cleanup {
        let removed = log
            .cleanup(days)
            .with_context(|| format!("cleanup of faces older than {days} days failed"))?;
        println!("Cleaned up {removed} old face images");
    } else if let Some(dest) = &cli.export {
        export(&log, dest.as_deref())?;
    } else if cli.prune_missing {
        let removed = log.prune_missing().context("failed to prune scan log")?;
        println!("Removed {removed} entries with missing images");
    } else {
        run_session(&cli, &config, &data_dir, log)?;
    }

    Ok(())
}

fn export(log: &ScanLog, dest: Option<&Path>) -> Result<()> {
    let dest = dest.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(format!("scan_log_{}.csv", Local::now().format("%Y%m%d_%H%M%S")))
    });

    if !log.path().exists() {
        println!("No scan log at {}; nothing to export", log.path().display());
        return Ok(());
    }

    let rows = log
        .export_csv(&dest)
        .with_context(|| format!("failed to export scan log to {}", dest.display()))?;
    println!("Scan log exported to {} ({rows} records)", dest.display());
    Ok(())
}

fn run_session(cli: &Cli, config: &Config, data_dir: &Path, log: ScanLog) -> Result<()> {
    let camera = Camera::open(&config.camera_device).map_err(|e| {
        let available: Vec<String> = Camera::list_devices()
            .into_iter()
            .map(|d| format!("{} ({})", d.path, d.name))
            .collect();
        let available = if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        };
        anyhow!(
            "could not open camera {}: {e} (capture devices found: {available}; set FACESCAN_CAMERA_DEVICE)",
            config.camera_device
        )
    })?;

    let mut detector = FaceDetector::load(&config.model_path, config.confidence_threshold)
        .context("failed to load face detection model (set FACESCAN_MODEL_PATH)")?;

    let mut stream = camera.stream().context("failed to start camera stream")?;
    stream
        .discard(config.warmup_frames)
        .context("camera failed during warmup")?;

    let store = FaceStore::in_data_dir(data_dir).with_crop_size(config.crop_size);
    let mut preview =
        (!cli.no_display).then(|| SnapshotPreview::new(data_dir.join(PREVIEW_FILE_NAME)));
    let mut keys = StdinKeys::new();

    println!("Starting face scanner...");
    if let Some(p) = &preview {
        println!("Live preview: {}", p.path().display());
    }
    println!("Type 'q' + Enter to quit, 's' + Enter to save the current face");

    let mut session = Session::new(store, log, SessionOptions { auto_save: !cli.no_save });
    let summary = session
        .run(
            &mut stream,
            &mut detector,
            &mut keys,
            preview.as_mut().map(|p| p as &mut dyn Preview),
        )
        .context("scanning session failed")?;

    println!(
        "Face scanner stopped: {} frames, {} faces detected, {} saved",
        summary.frames, summary.faces_detected, summary.faces_saved
    );
    if summary.save_failures > 0 {
        println!("{} faces could not be saved", summary.save_failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_without_file() {
        let cli = Cli::try_parse_from(["facescan", "--export"]).unwrap();
        assert!(matches!(cli.export, Some(None)));

        let cli = Cli::try_parse_from(["facescan", "--export", "out.csv"]).unwrap();
        assert_eq!(cli.export, Some(Some(PathBuf::from("out.csv"))));
    }

    #[test]
    fn test_report_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["facescan", "--stats", "--list-faces"]).is_err());
        assert!(Cli::try_parse_from(["facescan", "--cleanup", "7", "--export"]).is_err());
    }

    #[test]
    fn test_live_flags() {
        let args = ["facescan", "--data-dir", "/tmp/faces", "--no-save", "--no-display"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/faces")));
        assert!(cli.no_save && cli.no_display);
        assert_eq!(cli.cleanup, None);
    }

    #[test]
    fn test_export_missing_log_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let log = ScanLog::in_data_dir(dir.path());
        let dest = dir.path().join("out.csv");
        export(&log, Some(&dest)).unwrap();
        assert!(!dest.exists());
    }
}
