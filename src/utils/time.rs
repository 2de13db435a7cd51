//! Time formatting utilities

use std::time::Duration;

/// Seconds as `HH:MM:SS.mmm`, or `MM:SS.mmm` under an hour
pub fn format_hms(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// Format an elapsed duration for display
pub fn format_duration(duration: Duration) -> String {
    format_hms(duration.as_secs_f64())
}
