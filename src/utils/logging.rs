//! Logging configuration and subscriber setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::domain::errors::DomainError;
use crate::ports::LogLevel;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable multi-line format
    #[default]
    Pretty,
    /// Single-line text format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log format: {}. Valid formats: pretty, compact, json",
                value
            ))),
        }
    }
}

/// Logging configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include target module information
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            target: false,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self {
            level,
            format,
            target: matches!(level, LogLevel::Debug | LogLevel::Trace),
        }
    }

    /// RUST_LOG wins over the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_filter()))
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// free for command output.
    pub fn initialize(&self) -> Result<(), DomainError> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_target(self.target)
            .with_writer(std::io::stderr);

        let result = match self.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        result.map_err(|e| DomainError::InternalError(format!("Failed to initialize logging: {}", e)))?;

        tracing::debug!(level = ?self.level, format = ?self.format, "Logging initialized");
        Ok(())
    }
}

/// Log version and platform once at startup
pub fn log_system_info() {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "MontageX starting"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact").unwrap(), LogFormat::Compact);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_debug_level_shows_targets() {
        assert!(LoggingConfig::new(LogLevel::Debug, LogFormat::Pretty).target);
        assert!(!LoggingConfig::new(LogLevel::Info, LogFormat::Json).target);
    }
}
