//! Progress tracking for the external encoder
//!
//! The encoder is run with `-progress pipe:2`, which interleaves blocks of
//! `key=value` lines with its ordinary diagnostics on stderr. A block ends
//! with a `progress=continue` or `progress=end` line.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called when the encoder process starts
    fn on_start(&self, operation: &str, expected_duration: f64);

    /// Called for every completed progress block
    fn on_progress(&self, update: &ProgressUpdate);

    /// Called for every non-progress line the engine prints
    fn on_log_line(&self, line: &str) {
        debug!(target: "encoder", "{}", line);
    }

    /// Called when the encoder exits successfully
    fn on_complete(&self, elapsed: Duration);

    /// Called when the encoder fails
    fn on_error(&self, error: &str);

    /// Called when the encoder is terminated by timeout or request
    fn on_cancel(&self, reason: &str);
}

/// One progress block reported by the encoder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Output timestamp reached so far, in seconds
    pub out_time: f64,
    /// Percentage of the expected output length (0.0 - 100.0)
    pub percent: f64,
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    /// Encoding speed relative to real time
    pub speed: Option<f64>,
    /// True for the final block
    pub finished: bool,
}

/// Incremental parser for `-progress` key/value blocks
#[derive(Debug, Default)]
pub struct ProgressParser {
    expected_duration: f64,
    current: ProgressUpdate,
}

impl ProgressParser {
    pub fn new(expected_duration: f64) -> Self {
        Self {
            expected_duration,
            current: ProgressUpdate::default(),
        }
    }

    /// Check whether a stderr line belongs to a progress block
    pub fn is_progress_line(line: &str) -> bool {
        match line.split_once('=') {
            Some((key, _)) => matches!(
                key.trim(),
                "frame"
                    | "fps"
                    | "stream_0_0_q"
                    | "bitrate"
                    | "total_size"
                    | "out_time_us"
                    | "out_time_ms"
                    | "out_time"
                    | "dup_frames"
                    | "drop_frames"
                    | "speed"
                    | "progress"
            ),
            None => false,
        }
    }

    /// Feed one line; returns a complete update when a block ends
    pub fn feed(&mut self, line: &str) -> Option<ProgressUpdate> {
        let (key, value) = line.split_once('=')?;
        let value = value.trim();
        match key.trim() {
            "frame" => self.current.frame = value.parse().ok(),
            "fps" => self.current.fps = value.parse().ok(),
            // Both keys carry microseconds despite the name of the second
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time = us.max(0) as f64 / 1_000_000.0;
                }
            }
            "speed" => {
                self.current.speed = value.trim_end_matches('x').trim().parse().ok();
            }
            "progress" => {
                self.current.finished = value == "end";
                self.current.percent = if self.current.finished {
                    100.0
                } else if self.expected_duration > 0.0 {
                    (self.current.out_time / self.expected_duration * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                };
                return Some(std::mem::take(&mut self.current));
            }
            _ => {}
        }
        None
    }
}

/// Logs progress through tracing, at most once per percent step
pub struct ConsoleProgressCallback {
    step: f64,
    last_reported: Mutex<Option<f64>>,
    started: Mutex<Option<Instant>>,
}

impl ConsoleProgressCallback {
    pub fn new(step: f64) -> Self {
        Self {
            step: step.max(0.1),
            last_reported: Mutex::new(None),
            started: Mutex::new(None),
        }
    }

    fn should_report(&self, percent: f64) -> bool {
        let Ok(mut last) = self.last_reported.lock() else {
            return true;
        };
        match *last {
            Some(previous) if percent - previous < self.step && percent < 100.0 => false,
            _ => {
                *last = Some(percent);
                true
            }
        }
    }
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, operation: &str, expected_duration: f64) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        info!(operation, expected_duration, "Encoder started");
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        if self.should_report(update.percent) {
            info!(
                percent = format!("{:.1}", update.percent),
                out_time = format!("{:.2}", update.out_time),
                speed = update.speed.map(|s| format!("{:.2}x", s)).unwrap_or_default(),
                "Encoding progress"
            );
        }
    }

    fn on_complete(&self, elapsed: Duration) {
        info!(elapsed_ms = elapsed.as_millis() as u64, "Encoder finished");
    }

    fn on_error(&self, error: &str) {
        warn!(error, "Encoder failed");
    }

    fn on_cancel(&self, reason: &str) {
        warn!(reason, "Encoder cancelled");
    }
}

/// JSON progress callback for structured output
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str, expected_duration: f64) {
        let event = serde_json::json!({
            "event": "start",
            "operation": operation,
            "expected_duration": expected_duration,
        });
        println!("{}", event);
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        if let Ok(json) = serde_json::to_string(update) {
            println!("{{\"event\":\"progress\",\"data\":{}}}", json);
        }
    }

    fn on_complete(&self, elapsed: Duration) {
        let event = serde_json::json!({
            "event": "complete",
            "elapsed_seconds": elapsed.as_secs_f64(),
        });
        println!("{}", event);
    }

    fn on_error(&self, error: &str) {
        println!("{}", serde_json::json!({ "event": "error", "error": error }));
    }

    fn on_cancel(&self, reason: &str) {
        println!("{}", serde_json::json!({ "event": "cancel", "reason": reason }));
    }
}

/// Callback that ignores everything
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_start(&self, _operation: &str, _expected_duration: f64) {}
    fn on_progress(&self, _update: &ProgressUpdate) {}
    fn on_log_line(&self, _line: &str) {}
    fn on_complete(&self, _elapsed: Duration) {}
    fn on_error(&self, _error: &str) {}
    fn on_cancel(&self, _reason: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_emits_update_at_block_end() {
        let mut parser = ProgressParser::new(30.0);
        assert!(parser.feed("frame=450").is_none());
        assert!(parser.feed("fps=29.97").is_none());
        assert!(parser.feed("out_time_us=15000000").is_none());
        assert!(parser.feed("speed=2.5x").is_none());
        let update = parser.feed("progress=continue").unwrap();
        assert_eq!(update.frame, Some(450));
        assert_eq!(update.out_time, 15.0);
        assert_eq!(update.percent, 50.0);
        assert_eq!(update.speed, Some(2.5));
        assert!(!update.finished);
    }

    #[test]
    fn test_parser_end_block_is_complete() {
        let mut parser = ProgressParser::new(30.0);
        parser.feed("out_time_ms=1000000");
        let update = parser.feed("progress=end").unwrap();
        assert!(update.finished);
        assert_eq!(update.percent, 100.0);
    }

    #[test]
    fn test_parser_ignores_unparseable_values() {
        let mut parser = ProgressParser::new(10.0);
        parser.feed("out_time_us=N/A");
        parser.feed("speed=N/A");
        let update = parser.feed("progress=continue").unwrap();
        assert_eq!(update.out_time, 0.0);
        assert_eq!(update.speed, None);
    }

    #[test]
    fn test_progress_line_detection() {
        assert!(ProgressParser::is_progress_line("out_time_us=100"));
        assert!(ProgressParser::is_progress_line("progress=end"));
        assert!(!ProgressParser::is_progress_line("[Parsed_zoompan_3] some warning"));
        assert!(!ProgressParser::is_progress_line("Error initializing filter 'drawtext' with args 'text=x'"));
    }

    #[test]
    fn test_console_callback_throttles() {
        let callback = ConsoleProgressCallback::new(10.0);
        assert!(callback.should_report(1.0));
        assert!(!callback.should_report(5.0));
        assert!(callback.should_report(11.5));
        assert!(callback.should_report(100.0));
    }
}
