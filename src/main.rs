//! MontageX command-line entry point
//!
//! # Usage
//!
//! ```bash
//! montage create -i talk.mp4 --format tiktok --duration 30 --pan --text "Watch till the end"
//! montage plan -i talk.mp4 --format instagram_square --logo logo.png
//! montage inspect -i talk.mp4 --top 10
//! montage formats
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use montagex_cli::cli::{commands, Cli, Commands};
use montagex_cli::ports::LogLevel;
use montagex_cli::utils::logging::log_system_info;
use montagex_cli::utils::{LogFormat, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::new(LogLevel::parse(&cli.log_level)?, LogFormat::parse(&cli.log_format)?);
    logging.initialize()?;
    log_system_info();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Create(args) => {
            info!("Executing create command");
            commands::create(config, args).await?;
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            commands::plan(config, args).await?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(config, args).await?;
        }
        Commands::Formats => commands::formats()?,
    }

    Ok(())
}
