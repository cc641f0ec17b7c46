//! Timestamp and clock-display utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format seconds as `m:ss` for progress displays
///
/// Non-finite or negative input renders as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Format the remaining time of a track as `-m:ss`
pub fn format_remaining(position: f64, duration: f64) -> String {
    format!("-{}", format_clock(duration - position))
}
