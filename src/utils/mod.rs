//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;
pub mod workspace;

pub use logging::{LogFormat, LoggingConfig};
pub use time::format_hms;
pub use workspace::RunWorkspace;
