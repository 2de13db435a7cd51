// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::errors::*;
use crate::engine::progress::ProgressCallback;

/// Raw facts reported by the engine's introspection for one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub path: PathBuf,
    /// Container duration in seconds, when the engine reports one
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
    /// Video stream is a single still frame (png, jpeg, ...)
    pub is_still_image: bool,
    pub format_name: String,
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Describe a media file
    async fn probe(&self, path: &Path) -> Result<ProbeReport, DomainError>;
}

/// Receiver of decoded PCM chunks
pub type PcmSink<'a> = dyn for<'s> FnMut(&'s [f32]) + Send + 'a;

/// Port for decoding audio into raw samples
#[async_trait]
pub trait AudioPort: Send + Sync {
    /// Stream the first audio track as mono f32 samples at `sample_rate`.
    /// Chunks are handed to `sink` as they arrive; returns the total sample count.
    /// Flipping `cancel` to true stops the decoder with `DomainError::Cancelled`.
    async fn decode_mono(
        &self,
        path: &Path,
        sample_rate: u32,
        sink: &mut PcmSink<'_>,
        cancel: watch::Receiver<bool>,
    ) -> Result<u64, DomainError>;
}

/// Fully formed invocation of the external encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    /// Arguments after the program name
    pub args: Vec<String>,
    /// Expected output length in seconds, used for progress percentages
    pub expected_duration: f64,
    pub timeout: Option<Duration>,
}

/// Result of a successful encode
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    pub elapsed: Duration,
    /// Trailing diagnostic lines the engine printed
    pub diagnostics: Vec<String>,
}

/// Port for running the external encoder
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Run the encoder to completion, relaying progress.
    /// Flipping `cancel` to true terminates the process.
    async fn encode(
        &self,
        request: &EncodeRequest,
        progress: &dyn ProgressCallback,
        cancel: watch::Receiver<bool>,
    ) -> Result<EncodeOutcome, DomainError>;

    /// Raw `-encoders` listing of the engine
    async fn list_encoders(&self) -> Result<String, DomainError>;

    /// Raw `-version` banner of the engine
    async fn engine_version(&self) -> Result<String, DomainError>;
}

/// Port for configuration file loading
pub trait ConfigPort: Send + Sync {
    /// Parse a configuration file into key/value overrides
    fn load_file(&self, path: &Path) -> Result<crate::config_initialization::FileConfig, DomainError>;
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
