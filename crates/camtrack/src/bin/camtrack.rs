//! `camtrack`: replay recorded camera messages and calibrate cameras offline.
//!
//! Usage:
//!   camtrack replay --device b8:27:eb:4f:10:2a --store prefs messages.log
//!   camtrack calibrate --device b8:27:eb:4f:10:2a --store prefs session.json
//!   camtrack show --device b8:27:eb:4f:10:2a --store prefs

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use camtrack::calib::{ConfigError, StoreError};
use camtrack::{
    replay, CalibrationScript, CameraDevice, DeviceConfig, DltProjectionSolver, JsonFileStore,
    JsonLinesSink, PreferenceStore, ScriptError, TrackerParams,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "camtrack",
    version,
    about = "Track and calibrate networked blob-tracking cameras"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Structured JSON logs (needs the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct DeviceArgs {
    /// Device id, usually the camera's MAC address.
    #[arg(long)]
    device: String,

    /// Directory holding the persisted camera records.
    #[arg(long)]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Push every line of a message log and print track events as JSON lines.
    Replay {
        #[command(flatten)]
        target: DeviceArgs,
        /// Device config (tracker parameters, initial intrinsics).
        #[arg(long)]
        config: Option<PathBuf>,
        /// One raw camera message per line.
        #[arg(value_name = "LOG")]
        input: PathBuf,
    },
    /// Run a recorded calibration session and persist the projection.
    Calibrate {
        #[command(flatten)]
        target: DeviceArgs,
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON with `world_points` and matching `captures`.
        session: PathBuf,
    },
    /// Print the persisted record of a device.
    Show {
        #[command(flatten)]
        target: DeviceArgs,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bad config: {0}")]
    Config(#[from] ConfigError),
    #[error("calibration failed: {0}")]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no stored preferences for device {0}")]
    NoRecord(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    camtrack::core::init_tracing(cli.json_logs);
    if cli.verbose > 0 {
        log::info!("-v has no effect with tracing, set RUST_LOG instead");
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    use camtrack::core::{init_with_level, level_from_verbosity};

    if let Err(e) = init_with_level(level_from_verbosity(cli.verbose)) {
        eprintln!("logger already installed: {e}");
    }
    if cli.json_logs {
        log::warn!("--json-logs needs the `tracing` feature, using plain logs");
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Replay {
            target,
            config,
            input,
        } => run_replay(&target, config.as_deref(), &input),
        Command::Calibrate {
            target,
            config,
            session,
        } => run_calibrate(&target, config.as_deref(), &session),
        Command::Show { target } => run_show(&target),
    }
}

fn open_device(target: &DeviceArgs, config: Option<&Path>) -> Result<CameraDevice, CliError> {
    let device = match config {
        Some(path) => CameraDevice::from_config(&target.device, &DeviceConfig::load_json(path)?),
        None => CameraDevice::new(&target.device, TrackerParams::default()),
    };
    Ok(device)
}

fn run_replay(target: &DeviceArgs, config: Option<&Path>, input: &Path) -> Result<(), CliError> {
    let store = JsonFileStore::new(&target.store);
    let mut device = open_device(target, config)?;
    if !device.load_preferences(&store) {
        log::warn!("{}: not calibrated, every message will be dropped", target.device);
    }

    let file = File::open(input).map_err(|source| CliError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let mut sink = JsonLinesSink::new(io::stdout().lock());
    let summary = replay(&mut device, BufReader::new(file), &mut sink)?;
    let events = sink.written();
    sink.finish()?;

    eprintln!(
        "{} messages: {} created, {} updated, {} malformed, {} rejected; {} events, {} live tracks",
        summary.messages,
        summary.created,
        summary.updated,
        summary.malformed,
        summary.rejected,
        events,
        summary.live_tracks
    );
    Ok(())
}

fn run_calibrate(
    target: &DeviceArgs,
    config: Option<&Path>,
    session: &Path,
) -> Result<(), CliError> {
    let store = JsonFileStore::new(&target.store);
    let mut device = open_device(target, config)?;
    let script = CalibrationScript::load_json(session)?;

    let outcome = script.run(
        &mut device,
        &DltProjectionSolver::default(),
        &store,
        &mut camtrack::core::NullSink,
    )?;
    let p = outcome.position;
    println!(
        "{}",
        json!({
            "device": target.device,
            "position": [p.x, p.y, p.z],
            "samples": outcome.samples.len(),
            "seen": outcome.seen(),
        })
    );
    Ok(())
}

fn run_show(target: &DeviceArgs) -> Result<(), CliError> {
    let store = JsonFileStore::new(&target.store);
    let record = store
        .get(&target.device)?
        .ok_or_else(|| CliError::NoRecord(target.device.clone()))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
