//! CLI module for MontageX
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CreateArgs, EngineArgs, InspectArgs, MontageArgs, PlanArgs};

/// MontageX social video montage builder
///
/// Turns a long-form source video into a short montage for social platforms:
/// picks the liveliest segments, reframes them and adds motion and overlays.
#[derive(Parser)]
#[command(name = "montage")]
#[command(about = "MontageX - Short social-media montages from long-form video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true, env = "MONTAGE_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format (pretty, compact, json)
    #[arg(long, default_value = "compact", global = true)]
    pub log_format: String,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a montage from a source video
    Create(CreateArgs),
    /// Show the filter graph and encode command without encoding
    Plan(PlanArgs),
    /// Describe a source video and its loudest moments
    Inspect(InspectArgs),
    /// List the supported target formats
    Formats,
}
