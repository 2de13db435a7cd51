//! FFmpeg audio decoding adapter
//!
//! Decodes the first audio stream to mono 32-bit float PCM on stdout and
//! streams it to the caller in chunks, so long sources never sit in memory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::ports::*;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// FFmpeg-based audio decoder
pub struct FFmpegAudioAdapter {
    program: PathBuf,
}

impl FFmpegAudioAdapter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Little-endian f32 samples in `bytes`; a trailing partial sample is kept in `carry`
fn decode_chunk(carry: &mut Vec<u8>, bytes: &[u8], out: &mut Vec<f32>) {
    carry.extend_from_slice(bytes);
    let whole = carry.len() - carry.len() % 4;
    out.clear();
    out.extend(
        carry[..whole]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
    );
    carry.drain(..whole);
}

async fn stop(child: &mut Child, path: &Path) -> DomainError {
    if let Err(e) = child.kill().await {
        warn!(path = %path.display(), error = %e, "Failed to kill audio decoder");
    }
    DomainError::Cancelled("cancelled by user".to_string())
}

#[async_trait]
impl AudioPort for FFmpegAudioAdapter {
    async fn decode_mono(
        &self,
        path: &Path,
        sample_rate: u32,
        sink: &mut PcmSink<'_>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<u64, DomainError> {
        if *cancel.borrow() {
            return Err(DomainError::Cancelled("cancelled by user".to_string()));
        }
        if !path.exists() {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }

        let rate = sample_rate.to_string();
        debug!(path = %path.display(), sample_rate, "Decoding audio");
        let mut child = Command::new(&self.program)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:a:0", "-vn", "-ac", "1", "-ar", &rate, "-f", "f32le", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::ToolMissing(format!("{}: {}", self.program.display(), e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::InternalError("decoder stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::InternalError("decoder stderr was not captured".to_string()))?;
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text).await;
            text
        });

        let mut reader = BufReader::new(stdout);
        let mut buffer = vec![0u8; READ_CHUNK_BYTES];
        let mut carry = Vec::with_capacity(4);
        let mut samples = Vec::with_capacity(READ_CHUNK_BYTES / 4);
        let mut total = 0u64;
        let mut watching = true;
        loop {
            let read = tokio::select! {
                read = reader.read(&mut buffer) => {
                    read.map_err(|e| DomainError::DecodeFail(format!("{}: {}", path.display(), e)))?
                }
                changed = cancel.changed(), if watching => {
                    match changed {
                        Ok(()) if *cancel.borrow() => return Err(stop(&mut child, path).await),
                        Ok(()) => {}
                        Err(_) => watching = false,
                    }
                    continue;
                }
            };
            if read == 0 {
                break;
            }
            decode_chunk(&mut carry, &buffer[..read], &mut samples);
            if !samples.is_empty() {
                total += samples.len() as u64;
                sink(&samples);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DomainError::DecodeFail(format!("{}: {}", path.display(), e)))?;
        let diagnostics = stderr_task.await.unwrap_or_default();
        if !status.success() {
            // An interrupt delivered to the process group stops the decoder first
            if *cancel.borrow() {
                return Err(DomainError::Cancelled("cancelled by user".to_string()));
            }
            return Err(DomainError::DecodeFail(format!(
                "{}: {}",
                path.display(),
                diagnostics.trim()
            )));
        }

        debug!(path = %path.display(), samples = total, "Audio decoded");
        Ok(total)
    }
}
