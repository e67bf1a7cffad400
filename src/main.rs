//! Moving Average Sensor CLI
//!
//! Reads upstream entity states as JSON lines and publishes the moving
//! average sensors' states as JSON lines on stdout.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use moving_average_sensor::{
    config::Config,
    create_shared_stats,
    source::{parse_line, JsonLinesSource, SourceState},
    JsonLinesPublisher, Runtime, VERSION,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "moving-avg")]
#[command(version = VERSION)]
#[command(about = "Time-weighted moving average of irregularly sampled sensors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read source states from stdin and publish averages on the wall clock
    Run {
        /// Configuration file (defaults to the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Poll interval in seconds, overriding the configuration
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Stop when stdin reaches end of input
        #[arg(long)]
        exit_on_eof: bool,
    },

    /// Replay recorded source states on their own timestamps
    Replay {
        /// File with one source state per line
        file: PathBuf,

        /// Configuration file (defaults to the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Poll interval in seconds, overriding the configuration
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Keep polling until this RFC 3339 instant after the last state
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },

    /// Validate the configuration
    Check {
        /// Configuration file (defaults to the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            poll_interval,
            exit_on_eof,
        } => cmd_run(config.as_deref(), poll_interval, exit_on_eof),
        Commands::Replay {
            file,
            config,
            poll_interval,
            until,
        } => cmd_replay(&file, config.as_deref(), poll_interval, until),
        Commands::Check { config } => cmd_check(config.as_deref()),
        Commands::Config => cmd_config(),
    }
}

fn cmd_run(
    config_path: Option<&Path>,
    poll_interval: Option<u64>,
    exit_on_eof: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path, poll_interval)?;
    let stats = create_shared_stats();
    let mut runtime = Runtime::new(&config, JsonLinesPublisher::stdout(), stats.clone())
        .context("Invalid configuration")?;

    tracing::info!(
        version = VERSION,
        sensors = config.sensors.len(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting moving average sensors"
    );

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut source = JsonLinesSource::new();
    source.start(std::io::BufReader::new(std::io::stdin()))?;

    runtime.run(source.receiver(), &running, exit_on_eof);

    source.stop();
    tracing::info!("Stopped");
    eprintln!("{}", stats.summary());
    Ok(())
}

fn cmd_replay(
    file: &Path,
    config_path: Option<&Path>,
    poll_interval: Option<u64>,
    until: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let config = load_config(config_path, poll_interval)?;
    let stats = create_shared_stats();
    let mut runtime = Runtime::new(&config, JsonLinesPublisher::stdout(), stats.clone())
        .context("Invalid configuration")?;

    let states = read_states(file)?;
    tracing::info!(states = states.len(), file = ?file, "Replaying source states");
    runtime.replay(states, until);

    let failed = runtime.failed_sensors();
    if !failed.is_empty() {
        tracing::warn!(?failed, "Some sensors stopped during replay");
    }
    eprintln!("{}", stats.summary());
    Ok(())
}

fn cmd_check(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path, None)?;

    println!("Configuration OK");
    println!("  Poll interval: {}s", config.poll_interval.as_secs());
    for sensor in &config.sensors {
        println!(
            "  {} <- {} (window {}s, timeout {}s, precision {})",
            sensor.name,
            sensor.entity_id,
            sensor.window_size.as_secs(),
            sensor.timeout.as_secs(),
            sensor.precision
        );
    }
    if config.sensors.is_empty() {
        println!("  No sensors configured");
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Load and validate the configuration, applying CLI overrides.
fn load_config(path: Option<&Path>, poll_interval: Option<u64>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Could not load configuration")?;

    if let Some(secs) = poll_interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    config.validate().context("Invalid configuration")?;
    if config.sensors.is_empty() {
        tracing::warn!("No sensors configured");
    }
    Ok(config)
}

/// Read a file of source states, one per line.
fn read_states(file: &Path) -> anyhow::Result<Vec<SourceState>> {
    let reader = std::io::BufReader::new(
        std::fs::File::open(file).with_context(|| format!("Could not open {file:?}"))?,
    );

    let mut states = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(state) => states.push(state),
            Err(e) => bail!("Line {}: {}", number + 1, e),
        }
    }
    Ok(states)
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
