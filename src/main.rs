//! autopark - replay recorded drives through space detection and parking control
//!
//! ```text
//! autopark [--config autopark.toml] detect traces/perpendicular_right.toml
//! autopark [--config autopark.toml] park traces/park_perpendicular_right.toml --kind perpendicular --side right
//! autopark config --output autopark.toml
//! ```

use autopark::actuation::LogSink;
use autopark::core::clock::ManualClock;
use autopark::detection::SpaceSearch;
use autopark::maneuver::{ManeuverRunner, SensorCache};
use autopark::replay::{self, Trace};
use autopark::{AppConfig, Error, Result, Side, SpaceKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "autopark")]
#[command(about = "Parking space detection and maneuver control")]
struct Args {
    /// Configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a drive past parked cars and print every detected space
    Detect {
        /// Trace file
        trace: PathBuf,
    },
    /// Replay a parking maneuver against recorded sensor values
    Park {
        /// Trace file
        trace: PathBuf,
        /// Space geometry
        #[arg(short, long, default_value = "perpendicular")]
        kind: SpaceKind,
        /// Side the space lies on
        #[arg(short, long, default_value = "right")]
        side: Side,
    },
    /// Write the default configuration
    Config {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("autopark v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        log::info!("Using config: {}", path.display());
    }

    match args.command {
        Command::Detect { trace } => detect(&config, &Trace::load(trace)?),
        Command::Park { trace, kind, side } => park(&config, &Trace::load(trace)?, kind, side),
        Command::Config { output } => write_config(&config, output),
    }
}

fn detect(config: &AppConfig, trace: &Trace) -> Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let search = SpaceSearch::new(config.detector_config(), config.detection.candidate_capacity)
        .with_output(tx);

    // Selector side: print spaces as they are published
    let printer = thread::Builder::new()
        .name("space-printer".to_string())
        .spawn(move || {
            for space in rx {
                match serde_json::to_string(&space) {
                    Ok(line) => println!("{}", line),
                    Err(e) => log::error!("Failed to encode space: {}", e),
                }
            }
        })?;

    let spaces = replay::replay_detection(trace, &search)?;
    drop(search);

    printer
        .join()
        .map_err(|_| Error::Other("space printer thread panicked".to_string()))?;

    log::info!("{} space(s) detected", spaces.len());
    Ok(())
}

fn park(config: &AppConfig, trace: &Trace, kind: SpaceKind, side: Side) -> Result<()> {
    let cache = Arc::new(SensorCache::new());
    let clock = Arc::new(ManualClock::new());

    let mut runner = ManeuverRunner::new(
        config.maneuver_config(),
        Arc::clone(&cache),
        LogSink::new(),
        clock.clone(),
    )
    .with_period(config.control_period())
    .with_timeout_policy(config.control.timeout_policy);

    let handle = runner.handle();
    ctrlc::set_handler(move || {
        log::warn!("Interrupted, aborting maneuver");
        handle.abort();
    })
    .map_err(|e| Error::Other(format!("failed to install Ctrl-C handler: {}", e)))?;

    let outcome = replay::replay_maneuver(trace, &mut runner, &cache, &clock, kind, side)?;

    log::info!(
        "Maneuver ended after {:.1}s simulated",
        clock.elapsed().as_secs_f32()
    );
    println!(
        "{}",
        serde_json::to_string(&outcome).map_err(|e| Error::Other(e.to_string()))?
    );
    Ok(())
}

fn write_config(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            config.to_file(&path)?;
            log::info!("Wrote configuration to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
