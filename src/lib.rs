//! MontageX Library
//!
//! Turns a long-form source video into a short social-media montage. The
//! crate decides which segments to use and builds the filter graph and
//! encode command; decoding and encoding are delegated to ffmpeg.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use config_initialization::MontageConfig;
pub use domain::errors::DomainError;
pub use domain::model::{MediaAsset, OutputSpec, Segment, TargetFormat};
pub use error::{ErrorKind, MontageError, MontageResult};

/// Check that the configured engine binaries can be found
pub fn init(config: &MontageConfig) -> MontageResult<()> {
    for program in [&config.ffmpeg, &config.ffprobe] {
        let resolved = which::which(program).map_err(|e| {
            DomainError::ToolMissing(format!(
                "{} not found ({}). Install ffmpeg or point --ffmpeg/--ffprobe at it",
                program.display(),
                e
            ))
        })?;
        tracing::debug!(program = %program.display(), resolved = %resolved.display(), "Engine binary found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_init_reports_missing_engine() {
        let config = MontageConfig {
            ffmpeg: PathBuf::from("/nonexistent/montage-test/ffmpeg"),
            ..MontageConfig::default()
        };
        let err = init(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("ffmpeg"));
    }
}
