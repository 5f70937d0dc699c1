//! APM Tracker CLI
//!
//! Records keyboard and mouse activity and reports actions per minute.

use anyhow::{bail, Context};
use apm_tracker::{
    collector::{check_permission, Collector, CollectorConfig},
    config::{Config, SourceConfig},
    core::{codec, ApmSummary},
    tracker::Tracker,
    VERSION,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apm-tracker")]
#[command(version = VERSION)]
#[command(about = "Actions-per-minute tracker for keyboard and mouse input", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data file location
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start recording activity
    Start {
        /// Input sources to record (keyboard, mouse, or all)
        #[arg(long)]
        sources: Option<String>,

        /// Run without the live status line
        #[arg(long, short)]
        daemon: bool,

        /// Maximum number of events to retain
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Print APM statistics from the saved data file
    Stats {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete all recorded activity
    Clear,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref(), cli.data_file).and_then(|config| {
        init_logging(config.log_file.as_deref())?;

        match cli.command {
            Commands::Start {
                sources,
                daemon,
                capacity,
            } => cmd_start(config, sources.as_deref(), daemon, capacity),
            Commands::Stats { json } => cmd_stats(&config, json),
            Commands::Clear => cmd_clear(&config),
            Commands::Config => cmd_config(&config, cli.config.as_deref()),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>, data_file: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Could not load configuration")?;

    if let Some(data_file) = data_file {
        config.data_file = data_file;
    }
    Ok(config)
}

fn cmd_start(
    mut config: Config,
    sources: Option<&str>,
    daemon: bool,
    capacity: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(sources) = sources {
        config.sources = SourceConfig::from_csv(sources);
    }
    if let Some(capacity) = capacity {
        config.capacity = capacity;
    }
    config.validate()?;

    if !check_permission() {
        bail!(
            "No readable input devices under /dev/input. \
             Run as root or add your user to the 'input' group."
        );
    }

    let mut tracker = Tracker::open(&config)?;
    let session = tracker.session();

    // Set up Ctrl+C / SIGTERM handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut collector = Collector::new(CollectorConfig {
        capture_keyboard: config.sources.keyboard,
        capture_mouse: config.sources.mouse,
    });
    collector.start().context("Could not start input collection")?;

    info!(
        version = VERSION,
        capacity = tracker.store().capacity(),
        data_file = ?tracker.data_file(),
        "APM Tracker started"
    );
    if !daemon {
        println!("APM Tracker v{VERSION} - press Ctrl+C to stop");
    }

    let receiver = collector.receiver().clone();
    let mut last_display: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                tracker.record(&event);
                // Drain whatever else is queued before doing periodic work.
                for event in receiver.try_iter() {
                    tracker.record(&event);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                error!("Collector disconnected unexpectedly");
                break;
            }
        }

        if !collector.is_running() {
            warn!("Input collection stopped");
            break;
        }

        let now = Utc::now().timestamp();
        tracker.tick(now);

        if !daemon && last_display.map_or(true, |t| t.elapsed() >= config.display_interval) {
            print_status_line(&tracker.summary(now));
            last_display = Some(Instant::now());
        }
    }

    if !daemon {
        println!();
    }
    collector.stop();

    let dropped = collector.dropped_events();
    if dropped > 0 {
        warn!(dropped, "Events were dropped because the queue was full");
    }

    // The final save must run even if it ends up failing.
    let saved = tracker.shutdown();

    println!("{}", session.summary());
    saved.context("Final save failed")?;
    Ok(())
}

fn print_status_line(summary: &ApmSummary) {
    print!(
        "\rAPM  1m: {:>7.2}  5m: {:>7.2}  1h: {:>7.2}  24h: {:>7.2}  7d: {:>7.2}  | events: {}",
        summary.last_minute,
        summary.last_5_minutes,
        summary.last_hour,
        summary.last_day,
        summary.last_7_days,
        summary.total_events
    );
    let _ = std::io::stdout().flush();
}

fn cmd_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    if !config.data_file.exists() {
        println!("No activity data found at {:?}", config.data_file);
        println!("Run 'apm-tracker start' to begin recording.");
        return Ok(());
    }

    let records = codec::load(&config.data_file, config.capacity)
        .with_context(|| format!("Could not read {:?}", config.data_file))?;
    let summary = ApmSummary::from_records(records, Utc::now().timestamp());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.report());
    }
    Ok(())
}

fn cmd_clear(config: &Config) -> anyhow::Result<()> {
    let mut tracker = Tracker::new(config)?;
    let removed = tracker
        .clear()
        .with_context(|| format!("Could not delete {:?}", tracker.data_file()))?;

    if removed {
        info!(path = ?tracker.data_file(), "Cleared activity data");
        println!("Deleted {:?}", tracker.data_file());
    } else {
        println!("No activity data to clear.");
    }
    Ok(())
}

fn cmd_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Install the tracing subscriber, writing to `log_file` when given.
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create log directory {parent:?}"))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {path:?}"))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Set up Ctrl+C / SIGTERM handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
