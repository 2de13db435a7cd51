//! Configuration initialization and hierarchy management
//!
//! Engine settings are resolved once per run with the precedence
//! CLI > environment (`MONTAGE_*`) > config file > defaults, and the result
//! is handed to the container as an explicit [`MontageConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::engine::encoder::HardwareAcceleration;
use crate::ports::ConfigPort;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;
pub const DEFAULT_ANALYSIS_WINDOW: f64 = 1.0;

/// One configuration layer; unset fields fall through to lower layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub hardware_acceleration: Option<String>,
    /// Seconds
    pub encode_timeout: Option<u64>,
    pub work_dir: Option<PathBuf>,
    pub debug_filter_log: Option<PathBuf>,
    pub seed: Option<u64>,
    pub sample_rate: Option<u32>,
    pub analysis_window: Option<f64>,
    pub fps: Option<u32>,
    pub font_file: Option<PathBuf>,
    /// Reject sources outside every duration category
    pub strict_duration: Option<bool>,
}

impl FileConfig {
    /// Overlay `higher` on top of `self`
    pub fn merge(self, higher: FileConfig) -> FileConfig {
        FileConfig {
            ffmpeg: higher.ffmpeg.or(self.ffmpeg),
            ffprobe: higher.ffprobe.or(self.ffprobe),
            hardware_acceleration: higher.hardware_acceleration.or(self.hardware_acceleration),
            encode_timeout: higher.encode_timeout.or(self.encode_timeout),
            work_dir: higher.work_dir.or(self.work_dir),
            debug_filter_log: higher.debug_filter_log.or(self.debug_filter_log),
            seed: higher.seed.or(self.seed),
            sample_rate: higher.sample_rate.or(self.sample_rate),
            analysis_window: higher.analysis_window.or(self.analysis_window),
            fps: higher.fps.or(self.fps),
            font_file: higher.font_file.or(self.font_file),
            strict_duration: higher.strict_duration.or(self.strict_duration),
        }
    }

    /// Read the `MONTAGE_*` environment layer
    pub fn from_env() -> Result<FileConfig, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment layer from an arbitrary lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<FileConfig, DomainError> {
        fn number<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, DomainError> {
            value
                .map(|v| {
                    v.trim()
                        .parse()
                        .map_err(|_| DomainError::BadArgs(format!("Invalid value for {}: {}", key, v)))
                })
                .transpose()
        }

        let config = FileConfig {
            ffmpeg: lookup("MONTAGE_FFMPEG").map(PathBuf::from),
            ffprobe: lookup("MONTAGE_FFPROBE").map(PathBuf::from),
            hardware_acceleration: lookup("MONTAGE_HARDWARE_ACCELERATION"),
            encode_timeout: number("MONTAGE_ENCODE_TIMEOUT", lookup("MONTAGE_ENCODE_TIMEOUT"))?,
            work_dir: lookup("MONTAGE_WORK_DIR").map(PathBuf::from),
            debug_filter_log: lookup("MONTAGE_DEBUG_FILTER_LOG").map(PathBuf::from),
            seed: number("MONTAGE_SEED", lookup("MONTAGE_SEED"))?,
            sample_rate: number("MONTAGE_SAMPLE_RATE", lookup("MONTAGE_SAMPLE_RATE"))?,
            analysis_window: number("MONTAGE_ANALYSIS_WINDOW", lookup("MONTAGE_ANALYSIS_WINDOW"))?,
            fps: number("MONTAGE_FPS", lookup("MONTAGE_FPS"))?,
            font_file: lookup("MONTAGE_FONT_FILE").map(PathBuf::from),
            strict_duration: number("MONTAGE_STRICT_DURATION", lookup("MONTAGE_STRICT_DURATION"))?,
        };
        if config != FileConfig::default() {
            debug!(?config, "Environment overrides found");
        }
        Ok(config)
    }
}

/// Resolved engine settings for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MontageConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub hardware_acceleration: HardwareAcceleration,
    pub encode_timeout: Option<Duration>,
    /// Root for per-run temporary directories; system temp when unset
    pub work_dir: Option<PathBuf>,
    /// Where to mirror the constructed filter graph
    pub debug_filter_log: Option<PathBuf>,
    pub seed: Option<u64>,
    pub sample_rate: u32,
    /// Analysis window in seconds
    pub analysis_window: f64,
    pub fps: u32,
    pub font_file: Option<String>,
    pub strict_duration: bool,
}

impl Default for MontageConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            hardware_acceleration: HardwareAcceleration::Auto,
            encode_timeout: None,
            work_dir: None,
            debug_filter_log: None,
            seed: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            analysis_window: DEFAULT_ANALYSIS_WINDOW,
            fps: DEFAULT_FPS,
            font_file: None,
            strict_duration: false,
        }
    }
}

impl MontageConfig {
    /// Apply a merged layer over the defaults and validate the result
    pub fn from_layer(layer: FileConfig) -> Result<Self, DomainError> {
        let defaults = MontageConfig::default();

        let hardware_acceleration = match layer.hardware_acceleration.as_deref() {
            Some(value) => HardwareAcceleration::parse(value)?,
            None => defaults.hardware_acceleration,
        };
        let encode_timeout = match layer.encode_timeout {
            Some(0) => {
                return Err(DomainError::OutOfRange(
                    "encode timeout must be at least 1 second".to_string(),
                ))
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };
        let sample_rate = layer.sample_rate.unwrap_or(defaults.sample_rate);
        if !(1000..=192_000).contains(&sample_rate) {
            return Err(DomainError::OutOfRange(format!(
                "sample rate must be within 1000..=192000 Hz, got {}",
                sample_rate
            )));
        }
        let analysis_window = layer.analysis_window.unwrap_or(defaults.analysis_window);
        if !(0.1..=10.0).contains(&analysis_window) {
            return Err(DomainError::OutOfRange(format!(
                "analysis window must be within 0.1..=10 seconds, got {}",
                analysis_window
            )));
        }
        let fps = layer.fps.unwrap_or(defaults.fps);
        if !(1..=120).contains(&fps) {
            return Err(DomainError::OutOfRange(format!("fps must be within 1..=120, got {}", fps)));
        }

        Ok(Self {
            ffmpeg: layer.ffmpeg.unwrap_or(defaults.ffmpeg),
            ffprobe: layer.ffprobe.unwrap_or(defaults.ffprobe),
            hardware_acceleration,
            encode_timeout,
            work_dir: layer.work_dir,
            debug_filter_log: layer.debug_filter_log,
            seed: layer.seed,
            sample_rate,
            analysis_window,
            fps,
            font_file: layer.font_file.map(|p| p.to_string_lossy().to_string()),
            strict_duration: layer.strict_duration.unwrap_or(defaults.strict_duration),
        })
    }
}

/// Resolve the configuration hierarchy: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(
    config_port: &dyn ConfigPort,
    config_file: Option<&Path>,
    cli_layer: FileConfig,
) -> Result<MontageConfig, DomainError> {
    info!("Initializing configuration hierarchy");

    let file_layer = match config_file {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            config_port.load_file(path)?
        }
        None => FileConfig::default(),
    };
    let env_layer = FileConfig::from_env()?;

    let config = MontageConfig::from_layer(file_layer.merge(env_layer).merge(cli_layer))?;
    debug!(?config, "Configuration resolved");
    Ok(config)
}
