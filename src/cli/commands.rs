//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapters::TomlConfigAdapter;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::MontageRequest;
use crate::cli::args::{CreateArgs, EngineArgs, InspectArgs, MontageArgs, PlanArgs};
use crate::config_initialization::{initialize_configuration_hierarchy, MontageConfig};
use crate::domain::model::TargetFormat;
use crate::domain::rules::SpecValidator;
use crate::engine::{ConsoleProgressCallback, JsonProgressCallback, ProgressCallback};
use crate::utils::{format_hms, time::format_duration};

/// Resolve configuration and check that the engine is installed
async fn build_container(config_file: Option<&Path>, engine: &EngineArgs) -> Result<DefaultAppContainer> {
    let config = load_config(config_file, engine)?;
    crate::init(&config).context("External engine is not available")?;
    Ok(DefaultAppContainer::initialize(config).await)
}

fn load_config(config_file: Option<&Path>, engine: &EngineArgs) -> Result<MontageConfig> {
    let adapter = TomlConfigAdapter::new();
    initialize_configuration_hierarchy(&adapter, config_file, engine.to_file_config())
        .context("Failed to resolve configuration")
}

/// Parse and validate the montage options before touching the engine
fn build_request(args: &MontageArgs) -> Result<MontageRequest> {
    let spec = args.to_output_spec().context("Invalid montage options")?;
    SpecValidator::validate(&spec).context("Invalid montage options")?;
    Ok(MontageRequest {
        sources: args.sources().context("Invalid montage options")?,
        spec,
    })
}

/// Flips to true on Ctrl-C
fn cancel_on_interrupt() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            let _ = cancel_tx.send(true);
        }
    });
    cancel_rx
}

/// Execute the create command
pub async fn create(config_file: Option<&Path>, args: CreateArgs) -> Result<()> {
    let request = build_request(&args.montage)?;
    info!(
        sources = request.sources.len(),
        first = %request.sources[0].display(),
        output = %request.spec.output_path.display(),
        format = %request.spec.format,
        duration = request.spec.total_duration,
        "Starting montage"
    );

    let container = build_container(config_file, &args.engine).await?;
    info!(encoder = %container.encoder(), "Encoder selected");

    let cancel_rx = cancel_on_interrupt();

    let progress: Box<dyn ProgressCallback> = if args.json {
        Box::new(JsonProgressCallback)
    } else {
        Box::new(ConsoleProgressCallback::default())
    };

    let report = container
        .montage_interactor()
        .execute(&request, progress.as_ref(), cancel_rx)
        .await
        .context("Montage failed")?;

    if args.json {
        let json = serde_json::to_string(&report).context("Failed to serialize report")?;
        println!("{{\"event\":\"report\",\"data\":{}}}", json);
        return Ok(());
    }

    if let Some(warning) = &report.warning {
        println!("Warning: {}", warning.message);
    }
    println!("Montage written to {}", report.output_path.display());
    println!("  Length:   {}", format_hms(report.duration));
    println!("  Segments: {}", report.segments.len());
    for (i, segment) in report.segments.iter().enumerate() {
        println!(
            "    {:>2}. {} +{}",
            i + 1,
            format_hms(segment.start_ms as f64 / 1000.0),
            format_hms(segment.duration_ms as f64 / 1000.0)
        );
    }
    let fallback = if report.fell_back { " (software fallback)" } else { "" };
    println!("  Encoder:  {}{}", report.encoder, fallback);
    println!("  Elapsed:  {}", format_duration(report.elapsed));
    Ok(())
}

/// Execute the plan command
pub async fn plan(config_file: Option<&Path>, args: PlanArgs) -> Result<()> {
    let request = build_request(&args.montage)?;
    let container = build_container(config_file, &args.engine).await?;

    let preview = container
        .montage_interactor()
        .plan(&request, cancel_on_interrupt())
        .await
        .context("Planning failed")?;

    if let Some(warning) = &preview.prepared.selection.warning {
        println!("Warning: {}\n", warning.message);
    }
    println!("# Filter graph");
    println!("{}\n", preview.filter_complex);
    println!("# Stages");
    println!("{}", preview.debug_dump);
    println!("# Command");
    let command: Vec<String> = preview.command.iter().map(|arg| quote_arg(arg)).collect();
    println!("ffmpeg {}", command.join(" "));
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(config_file: Option<&Path>, args: InspectArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow::anyhow!("Input file does not exist: {}", args.input.display()));
    }
    let container = build_container(config_file, &args.engine).await?;

    let report = container
        .inspect_interactor()
        .inspect(&args.input, args.top, cancel_on_interrupt())
        .await
        .context("Failed to inspect input file")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

/// Execute the formats command
pub fn formats() -> Result<()> {
    println!("Supported formats:");
    for format in TargetFormat::ALL {
        let (width, height) = format.dimensions();
        println!("  {:<18} {}x{}  {}", format.id(), width, height, format.description());
    }
    Ok(())
}

/// Quote an argument for copy-pasting into a POSIX shell
fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+[]@%,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("-map"), "-map");
        assert_eq!(quote_arg("[vout]"), "[vout]");
        assert_eq!(quote_arg("my clip.mp4"), "'my clip.mp4'");
        assert_eq!(quote_arg("it's"), r"'it'\''s'");
        assert_eq!(quote_arg(""), "''");
    }
}
