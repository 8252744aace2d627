//! handgest - replay recorded hand-tracking frames through the gesture engine.
//!
//! Reads one JSON `FrameSnapshot` per line and prints the published gesture
//! snapshot every few frames, the way a live tracking callback would feed
//! a UI or network transport.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use handgest::gesture::shape::load_templates;
use handgest::gesture::{Calibration, GestureConfig, GestureController, GestureSnapshot, LogSink};
use handgest::ipc::handle_message;
use handgest::FrameSnapshot;

#[derive(Parser, Debug)]
#[command(name = "handgest", about = "Hand-gesture recognition frame replay")]
struct Cli {
    /// Recorded frames, one JSON FrameSnapshot per line
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Directory of shape templates (*.txt rasters)
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Play-area calibration JSON (defaults when missing)
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Gesture config JSON; absent keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// IPC commands to run before replay, one s-expression per line
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Snapshot output format: json or sexp
    #[arg(long, default_value = "json")]
    format: String,

    /// Print a snapshot every N frames
    #[arg(long, default_value_t = 5)]
    every: u64,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("handgest {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let Some(frames) = cli.frames.as_deref() else {
        anyhow::bail!("--frames <FRAMES> is required");
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handgest=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    info!("handgest v{} starting", env!("CARGO_PKG_VERSION"));

    let as_sexp = match cli.format.as_str() {
        "json" => false,
        "sexp" => true,
        other => anyhow::bail!("unknown format: {other}. Use: json or sexp"),
    };

    let config = match &cli.config {
        Some(path) => GestureConfig::load(path)?,
        None => GestureConfig::default(),
    };
    let calibration = match &cli.calibration {
        Some(path) => Calibration::load_or_default(path)?,
        None => Calibration::default(),
    };
    let templates = cli
        .templates
        .as_deref()
        .map(load_templates)
        .unwrap_or_default();

    let mut controller = GestureController::new(config, calibration, templates, LogSink);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(path) = &cli.commands {
        run_commands(&mut controller, path, &mut out)?;
    }

    let every = cli.every.max(1);
    let reader = BufReader::new(
        File::open(frames)
            .with_context(|| format!("failed to open frames {}", frames.display()))?,
    );

    let mut replayed = 0u64;
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", frames.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameSnapshot = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("line {}: skipping malformed frame: {}", index + 1, e);
                continue;
            }
        };
        let snapshot = controller.process(&frame);
        replayed += 1;
        if replayed % every == 0 {
            emit(&mut out, &snapshot, as_sexp)?;
        }
    }

    info!("replayed {} frames", replayed);
    Ok(())
}

fn run_commands(
    controller: &mut GestureController<LogSink>,
    path: &Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let file = File::open(path)
        .with_context(|| format!("failed to open commands {}", path.display()))?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_message(controller, &line) {
            writeln!(out, "{}", response)?;
        }
    }
    Ok(())
}

fn emit(out: &mut impl Write, snapshot: &GestureSnapshot, as_sexp: bool) -> anyhow::Result<()> {
    if as_sexp {
        writeln!(out, "{}", snapshot.to_sexp())?;
    } else {
        writeln!(out, "{}", snapshot.to_json()?)?;
    }
    Ok(())
}
