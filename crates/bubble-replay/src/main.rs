//! Bubble Replay - Main Entry Point

use anyhow::Context;
use bubble_detector::{BubbleMonitor, DetectorConfig};
use bubble_replay::{init_logging, log_summary, replay};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(version, about = "Replay CSV sensor readings through the bubble detector")]
struct Args {
    /// TOML detector configuration (BUBBLE_* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV input, one column per channel; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level, args.json_logs)?;

    info!("=== Bubble Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let config =
        DetectorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let mut monitor = BubbleMonitor::new(config)?;

    let stdout = io::stdout().lock();
    let summary = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            replay(&mut monitor, BufReader::new(file), stdout)?
        }
        None => replay(&mut monitor, io::stdin().lock(), stdout)?,
    };

    log_summary(&monitor, &summary);
    Ok(())
}
