//! Tracing subscriber setup.
//!
//! `serve` logs to stdout. The dashboard owns the terminal, so it writes its
//! log to a file under the configuration directory instead.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::constants::DEFAULT_LOG_FILTER;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Logs to stdout for the API server.
pub fn init_server() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Appends plain-text logs to `path` for the dashboard.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_dashboard(path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
