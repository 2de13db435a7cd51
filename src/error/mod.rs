//! Error handling module for MontageX

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for montage pipeline operations
#[derive(Error, Debug)]
pub enum MontageError {
    /// Source or auxiliary media could not be described by the engine
    #[error("Failed to probe media file {path}: {message}")]
    Probe { path: String, message: String },

    /// Audio track is unreadable or corrupt
    #[error("Audio analysis failed for {path}: {message}")]
    Analysis { path: String, message: String },

    /// Geometrically or temporally impossible request
    #[error("Planning failed: {message}")]
    Plan { message: String },

    /// Filter graph invariant violated while building
    #[error("Filter graph construction failed: {message}")]
    Build { message: String },

    /// External engine exited with a non-zero status
    #[error("Encoding failed{}: {diagnostics}", .exit_code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    Encode {
        exit_code: Option<i32>,
        diagnostics: String,
    },

    /// Run terminated by timeout or user request
    #[error("Cancelled: {reason}")]
    Cancelled { reason: String },

    /// Invalid configuration or options
    #[error("Invalid configuration: {0}")]
    Config(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tag identifying which stage produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Probe,
    Analysis,
    Plan,
    Build,
    Encode,
    Cancelled,
    Config,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Probe => "ProbeError",
            ErrorKind::Analysis => "AnalysisError",
            ErrorKind::Plan => "PlanError",
            ErrorKind::Build => "BuildError",
            ErrorKind::Encode => "EncodeError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

impl MontageError {
    /// Stage tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MontageError::Probe { .. } => ErrorKind::Probe,
            MontageError::Analysis { .. } => ErrorKind::Analysis,
            MontageError::Plan { .. } => ErrorKind::Plan,
            MontageError::Build { .. } => ErrorKind::Build,
            MontageError::Encode { .. } => ErrorKind::Encode,
            MontageError::Cancelled { .. } => ErrorKind::Cancelled,
            MontageError::Config(_) => ErrorKind::Config,
            MontageError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn plan(message: impl Into<String>) -> Self {
        MontageError::Plan {
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        MontageError::Build {
            message: message.into(),
        }
    }

    /// Map a port failure raised while probing `path`
    pub fn from_probe(path: &str, err: DomainError) -> Self {
        MontageError::Probe {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Map a port failure raised while analyzing audio of `path`
    pub fn from_analysis(path: &str, err: DomainError) -> Self {
        match err {
            DomainError::Cancelled(reason) => MontageError::Cancelled { reason },
            other => MontageError::Analysis {
                path: path.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Map a port failure raised by the encoder process
    pub fn from_encode(err: DomainError) -> Self {
        match err {
            DomainError::ExternalFailure {
                exit_code,
                diagnostics,
            } => MontageError::Encode {
                exit_code,
                diagnostics,
            },
            DomainError::Cancelled(reason) => MontageError::Cancelled { reason },
            other => MontageError::Encode {
                exit_code: None,
                diagnostics: other.to_string(),
            },
        }
    }
}

/// Result type alias for montage operations
pub type MontageResult<T> = std::result::Result<T, MontageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failure_keeps_diagnostics_verbatim() {
        let err = MontageError::from_encode(DomainError::ExternalFailure {
            exit_code: Some(1),
            diagnostics: "Invalid filter 'zoompan'".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert_eq!(
            err.to_string(),
            "Encoding failed (exit code 1): Invalid filter 'zoompan'"
        );
    }

    #[test]
    fn test_cancellation_maps_to_cancelled_kind() {
        let err = MontageError::from_encode(DomainError::Cancelled("timeout after 5s".to_string()));
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_cancelled_decode_is_not_an_analysis_error() {
        let err = MontageError::from_analysis("in.mp4", DomainError::Cancelled("cancelled by user".into()));
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.to_string(), "Cancelled: cancelled by user");

        let err = MontageError::from_analysis("in.mp4", DomainError::DecodeFail("corrupt".into()));
        assert_eq!(err.kind(), ErrorKind::Analysis);
    }

    #[test]
    fn test_probe_error_carries_path() {
        let err = MontageError::from_probe("in.mp4", DomainError::ProbeFail("zero duration".into()));
        assert!(err.to_string().contains("in.mp4"));
        assert_eq!(err.kind().to_string(), "ProbeError");
    }
}
