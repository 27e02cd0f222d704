//! Application-wide constants and configuration values.
//!
//! This module defines all static configuration values used throughout tunnelsim,
//! including timing intervals, simulation bounds, API paths, and UI messages.

use std::time::Duration;

// === Application Metadata ===

/// Application name used in logging and directories.
pub const APP_NAME: &str = "tunnelsim";
/// Current application version from Cargo.toml.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Timing Configuration ===

/// UI refresh rate in milliseconds.
pub const DEFAULT_TICK_RATE: u64 = 250;
/// Period of the live-metrics ticker while connected.
pub const METRICS_TICK_PERIOD: Duration = Duration::from_secs(1);
/// Simulated handshake delay before the connect request is sent.
pub const DEFAULT_CONNECT_DELAY_MS: u64 = 2000;
/// Simulated teardown delay before the disconnect request is sent.
pub const DEFAULT_DISCONNECT_DELAY_MS: u64 = 1000;
/// Event log lines kept in memory.
pub const MAX_LOG_LINES: usize = 1000;
/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);
/// Timeout for a single API request made by the dashboard.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest the dashboard waits on exit to close an open session.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

// === Path Configuration ===

/// Name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "tunnelsim";
/// Name of the optional JSON configuration file.
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Name of the SQLite database file used by `serve`.
pub const DATABASE_FILE_NAME: &str = "tunnelsim.db";
/// Name of the dashboard's tracing log file.
pub const LOG_FILE_NAME: &str = "tunnelsim.log";

// === Network Defaults ===

/// Default listen address of the API server.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
/// Default base URL the dashboard talks to.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/";
/// Username the dashboard identifies as when none is configured.
pub const DEFAULT_USERNAME: &str = "demo";
/// Header carrying the caller's username.
pub const USER_HEADER: &str = "x-tunnelsim-user";
/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "tunnelsim=info,tower_http=info";

// === Simulation Bounds ===

/// Initial download speed range in Mbps (inclusive low, exclusive high).
pub const DOWNLOAD_SEED_RANGE: (u32, u32) = (60, 100);
/// Initial upload speed range in Mbps (inclusive low, exclusive high).
pub const UPLOAD_SEED_RANGE: (u32, u32) = (30, 50);
/// Download speed clamp once perturbed.
pub const DOWNLOAD_CLAMP: (u32, u32) = (30, 100);
/// Upload speed clamp once perturbed.
pub const UPLOAD_CLAMP: (u32, u32) = (20, 60);
/// Per-tick download variation (inclusive low, exclusive high).
pub const DOWNLOAD_JITTER: (i64, i64) = (-5, 5);
/// Per-tick upload variation (inclusive low, exclusive high).
pub const UPLOAD_JITTER: (i64, i64) = (-3, 3);
/// Chance that a tick perturbs the speeds.
pub const SPEED_PERTURB_PROBABILITY: f64 = 0.2;
/// Per-tick data usage in KiB (inclusive low, exclusive high).
pub const DATA_DELTA_KIB: (u64, u64) = (10, 50);
/// Number of servers shown in the recommended list.
pub const RECOMMENDED_COUNT: usize = 5;

// === UI Messages ===

/// Backend initialization message.
pub const MSG_BACKEND_INIT: &str = "IO: Loading server catalog...";
/// Ready state message.
pub const MSG_READY: &str = "SUCCESS: Dashboard active. Press [?] for help.";
/// Shown for the connection time when not connected.
pub const MSG_NOT_CONNECTED: &str = "Not connected";
/// Data fetching placeholder.
pub const MSG_FETCHING: &str = "Fetching...";
/// No data available placeholder.
pub const MSG_NO_DATA: &str = "---";
