//! simsubd - multi-SIM subscription activation daemon
//!
//! This is the binary entry point. The coordinator lives in `simsub-app`.

mod headless;

use std::path::PathBuf;

use clap::Parser;
use simsub_app::config;
use simsub_core::logging;
use simsub_core::prelude::*;

/// simsubd - activate and deactivate SIM subscriptions across radio slots
#[derive(Parser, Debug)]
#[command(name = "simsubd")]
#[command(about = "Multi-SIM subscription activation daemon", long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of radio slots (overrides the config file)
    #[arg(long, value_name = "N")]
    slots: Option<usize>,

    /// Write a commented default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install().map_err(|e| Error::startup(e.to_string()))?;

    let config_path = args
        .config
        .or_else(config::default_config_path)
        .unwrap_or_else(|| PathBuf::from("simsub.toml"));

    if args.init_config {
        config::init_config_file(&config_path)?;
        eprintln!("Config file: {}", config_path.display());
        return Ok(());
    }

    // Log to file, stdout carries the event stream
    let _log_guard = logging::init()?;

    let result = headless::runner::run_headless(&config_path, args.slots).await;

    if let Err(ref e) = result {
        error!("Daemon error: {:?}", e);
    }

    result
}
