//! Logging setup for the daemon
//!
//! Everything goes to a daily-rotated file; stdout is reserved for the
//! event stream. Writes are handed to a background thread, so the returned
//! guard must live as long as the process.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Filter directive, e.g. `SIMSUB_LOG=simsub_app=trace`
pub const LOG_ENV: &str = "SIMSUB_LOG";

/// Overrides the log directory
pub const LOG_DIR_ENV: &str = "SIMSUB_LOG_DIR";

const LOG_FILE_PREFIX: &str = "simsubd.log";

const DEFAULT_FILTER: &str = "simsub=info,simsub_app=info,simsub_modem=info,simsub_core=info,warn";

/// Install the global subscriber.
///
/// ```bash
/// SIMSUB_LOG=debug simsubd
/// SIMSUB_LOG_DIR=/tmp/simsub SIMSUB_LOG=simsub_modem=trace simsubd
/// ```
pub fn init() -> Result<WorkerGuard> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!("simsubd {} logging to {}", env!("CARGO_PKG_VERSION"), log_dir.display());

    Ok(guard)
}

/// `$SIMSUB_LOG_DIR`, else `<data dir>/simsub/logs`
pub fn log_directory() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simsub")
        .join("logs")
}
