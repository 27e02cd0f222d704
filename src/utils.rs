//! Utility functions for formatting and path management.
//!
//! This module provides helper functions for formatting durations, byte
//! counts and timestamps for the dashboard, and for locating the
//! configuration directory.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};

/// Formats a duration as a clock for the header.
///
/// - `Xd XXh` for durations >= 1 day
/// - `HH:MM:SS` otherwise
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 86400 {
        format!("{}d {:02}h", secs / 86400, (secs % 86400) / 3600)
    } else {
        format!(
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

/// Live session length for the stats panel, e.g. `Connected for: 1h 5m`.
///
/// Seconds are only shown during the first minute.
pub fn format_connection_time(elapsed_secs: u64) -> String {
    let hours = elapsed_secs / 3600;
    let minutes = (elapsed_secs % 3600) / 60;
    let seconds = elapsed_secs % 60;

    let mut parts = Vec::with_capacity(2);
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    } else {
        parts.push(format!("{seconds}s"));
    }
    format!("Connected for: {}", parts.join(" "))
}

/// Duration column of the history table: `Xh Ym`, `Ym`, or `-` when open.
pub fn format_history_duration(seconds: Option<i64>) -> String {
    let Some(seconds) = seconds else {
        return "-".to_string();
    };
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats a byte count with 1024-based units (B, KB, MB, GB).
pub fn format_data_used(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", value / KIB as f64)
    } else if bytes < GIB {
        format!("{:.1} MB", value / MIB as f64)
    } else {
        format!("{:.2} GB", value / GIB as f64)
    }
}

/// Data column of the history table; `-` while the session is open.
pub fn format_history_data(bytes: Option<i64>) -> String {
    bytes.map_or_else(
        || "-".to_string(),
        |b| format_data_used(u64::try_from(b).unwrap_or(0)),
    )
}

/// `connectedAt` as shown in the history table, in local time.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    format_timestamp_in(at, &Local)
}

fn format_timestamp_in<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%b %-d, %Y, %-I:%M %p").to_string()
}

/// Returns the application configuration directory path.
///
/// Creates the directory at `~/.config/tunnelsim` if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or
/// if directory creation fails.
pub fn get_app_config_dir() -> std::io::Result<std::path::PathBuf> {
    let home = home_dir().ok_or(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Home directory not found",
    ))?;
    let path = home.join(".config").join(crate::constants::CONFIG_DIR_NAME);

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }

    Ok(path)
}

/// Truncates a string to a maximum number of characters.
///
/// If the string exceeds `max_chars`, it is truncated and "..." is appended.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut t: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}

/// Returns the current local time formatted as HH:MM:SS.
pub fn format_local_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Returns the user's home directory.
///
/// Uses the HOME environment variable on Unix systems.
pub fn home_dir() -> Option<std::path::PathBuf> {
    std::env::var("HOME").ok().map(std::path::PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_clock() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(90)), "00:01:30");
        assert_eq!(format_duration(Duration::from_secs(86399)), "23:59:59");
    }

    #[test]
    fn test_format_duration_days() {
        assert_eq!(format_duration(Duration::from_secs(86400)), "1d 00h");
        assert_eq!(format_duration(Duration::from_secs(90000)), "1d 01h");
    }

    #[test]
    fn test_format_connection_time() {
        assert_eq!(format_connection_time(0), "Connected for: 0s");
        assert_eq!(format_connection_time(42), "Connected for: 42s");
        assert_eq!(format_connection_time(60), "Connected for: 1m");
        assert_eq!(format_connection_time(3599), "Connected for: 59m");
        assert_eq!(format_connection_time(3600), "Connected for: 1h 0m");
        assert_eq!(format_connection_time(3900), "Connected for: 1h 5m");
    }

    #[test]
    fn test_format_history_duration() {
        assert_eq!(format_history_duration(None), "-");
        assert_eq!(format_history_duration(Some(59)), "0m");
        assert_eq!(format_history_duration(Some(150)), "2m");
        assert_eq!(format_history_duration(Some(7260)), "2h 1m");
    }

    #[test]
    fn test_format_data_used_units() {
        assert_eq!(format_data_used(0), "0 B");
        assert_eq!(format_data_used(1023), "1023 B");
        assert_eq!(format_data_used(1024), "1.0 KB");
        assert_eq!(format_data_used(1536), "1.5 KB");
        assert_eq!(format_data_used(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_data_used(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_history_data() {
        assert_eq!(format_history_data(None), "-");
        assert_eq!(format_history_data(Some(2048)), "2.0 KB");
    }

    #[test]
    fn test_format_timestamp_in_utc() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(format_timestamp_in(at, &Utc), "Mar 5, 2024, 2:07 PM");
    }

    #[test]
    fn test_format_local_time_shape() {
        let t = format_local_time();
        assert_eq!(t.len(), 8);
        assert_eq!(t.matches(':').count(), 2);
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("héllo world", 8), "héllo...");
    }
}
