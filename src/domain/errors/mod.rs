// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Numeric option outside its documented range
    OutOfRange(String),
    /// File not found
    FileNotFound(String),
    /// External engine could not describe the media
    ProbeFail(String),
    /// Audio stream could not be decoded
    DecodeFail(String),
    /// Required external tool is not installed
    ToolMissing(String),
    /// External engine exited unsuccessfully
    ExternalFailure {
        exit_code: Option<i32>,
        diagnostics: String,
    },
    /// Operation cancelled or timed out
    Cancelled(String),
    /// File system failure
    FsFail(String),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::OutOfRange(msg) => write!(f, "Out of range: {}", msg),
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::ProbeFail(msg) => write!(f, "Probe failed: {}", msg),
            DomainError::DecodeFail(msg) => write!(f, "Decode failed: {}", msg),
            DomainError::ToolMissing(msg) => write!(f, "Tool missing: {}", msg),
            DomainError::ExternalFailure {
                exit_code,
                diagnostics,
            } => match exit_code {
                Some(code) => write!(f, "External process exited with code {}: {}", code, diagnostics),
                None => write!(f, "External process terminated by signal: {}", diagnostics),
            },
            DomainError::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
