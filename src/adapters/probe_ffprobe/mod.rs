//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json -show_format -show_streams` and maps the
//! JSON document onto a [`ProbeReport`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

/// FFprobe JSON output format
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

const STILL_IMAGE_CODECS: [&str; 6] = ["png", "mjpeg", "bmp", "webp", "tiff", "gif"];

/// Map ffprobe JSON onto a probe report
pub fn parse_ffprobe_json(path: &Path, json: &[u8]) -> Result<ProbeReport, DomainError> {
    let probe: FfprobeOutput = serde_json::from_slice(json).map_err(|e| {
        DomainError::ProbeFail(format!("Unreadable ffprobe output for {}: {}", path.display(), e))
    })?;

    let format = probe.format.ok_or_else(|| {
        DomainError::ProbeFail(format!("No container information for {}", path.display()))
    })?;
    let format_name = format.format_name.unwrap_or_default();

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = format
        .duration
        .as_deref()
        .and_then(parse_seconds)
        .or_else(|| video.and_then(|v| v.duration.as_deref()).and_then(parse_seconds));

    let is_still_image = match video {
        Some(stream) => {
            let codec = stream.codec_name.as_deref().unwrap_or_default();
            STILL_IMAGE_CODECS.contains(&codec)
                && (format_name.contains("image2") || format_name.ends_with("_pipe"))
        }
        None => false,
    };

    Ok(ProbeReport {
        path: path.to_path_buf(),
        duration,
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        has_video: video.is_some(),
        has_audio,
        is_still_image,
        format_name,
    })
}

/// Parse a decimal seconds field; ffprobe prints "N/A" for unknown values
fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    program: PathBuf,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, DomainError> {
        if !path.exists() {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }

        debug!(program = %self.program.display(), path = %path.display(), "Running ffprobe");
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DomainError::ToolMissing(format!("{}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            return Err(DomainError::ProbeFail(format!(
                "ffprobe could not read {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_ffprobe_json(path, &output.stdout)
    }
}
