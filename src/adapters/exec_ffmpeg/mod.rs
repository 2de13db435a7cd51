//! FFmpeg execution adapter
//!
//! Runs the encoder as a child process. Stderr carries both the `-progress`
//! key/value blocks and ordinary log output; the former feed the progress
//! callback, the latter are logged and the tail is kept for error reports.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::engine::progress::{ProgressCallback, ProgressParser};
use crate::ports::*;

/// Diagnostic lines kept for failure reports
const DIAGNOSTIC_TAIL: usize = 40;

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    program: PathBuf,
}

impl FFmpegAdapter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Route one stderr line to the parser or the diagnostic tail
fn handle_line(
    line: &str,
    parser: &mut ProgressParser,
    progress: &dyn ProgressCallback,
    tail: &mut VecDeque<String>,
) {
    if ProgressParser::is_progress_line(line) {
        if let Some(update) = parser.feed(line) {
            progress.on_progress(&update);
        }
        return;
    }
    let line = line.trim_end();
    if line.is_empty() {
        return;
    }
    progress.on_log_line(line);
    if tail.len() == DIAGNOSTIC_TAIL {
        tail.pop_front();
    }
    tail.push_back(line.to_string());
}

#[async_trait]
impl EncodePort for FFmpegAdapter {
    async fn encode(
        &self,
        request: &EncodeRequest,
        progress: &dyn ProgressCallback,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<EncodeOutcome, DomainError> {
        if *cancel.borrow() {
            progress.on_cancel("cancelled before start");
            return Err(DomainError::Cancelled("cancelled before start".to_string()));
        }

        debug!(program = %self.program.display(), args = ?request.args, "Spawning encoder");
        let mut child = Command::new(&self.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::ToolMissing(format!("{}: {}", self.program.display(), e)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::InternalError("encoder stderr was not captured".to_string()))?;
        let mut lines = BufReader::new(stderr).lines();

        let started = Instant::now();
        progress.on_start("encode", request.expected_duration);

        let mut parser = ProgressParser::new(request.expected_duration);
        let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
        let mut stderr_open = true;
        let mut cancel_open = true;

        let deadline = request.timeout;
        let timer = async move {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(timer);

        let status = loop {
            tokio::select! {
                line = lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => handle_line(&line, &mut parser, progress, &mut tail),
                    Ok(None) => stderr_open = false,
                    Err(e) => {
                        warn!("Failed to read encoder output: {}", e);
                        stderr_open = false;
                    }
                },
                status = child.wait() => {
                    break status.map_err(|e| DomainError::InternalError(format!("waiting for encoder: {}", e)))?;
                }
                changed = cancel.changed(), if cancel_open => match changed {
                    Ok(()) if *cancel.borrow() => {
                        info!("Cancellation requested, stopping encoder");
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill encoder: {}", e);
                        }
                        progress.on_cancel("cancelled by user");
                        return Err(DomainError::Cancelled("cancelled by user".to_string()));
                    }
                    Ok(()) => {}
                    Err(_) => cancel_open = false,
                },
                _ = &mut timer => {
                    let reason = format!(
                        "timed out after {:.1}s",
                        deadline.map(|d| d.as_secs_f64()).unwrap_or_default()
                    );
                    warn!("Encoder {}, killing process", reason);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill encoder: {}", e);
                    }
                    progress.on_cancel(&reason);
                    return Err(DomainError::Cancelled(reason));
                }
            }
        };

        while let Ok(Some(line)) = lines.next_line().await {
            handle_line(&line, &mut parser, progress, &mut tail);
        }

        let elapsed = started.elapsed();
        let diagnostics: Vec<String> = tail.into_iter().collect();
        if status.success() {
            progress.on_complete(elapsed);
            Ok(EncodeOutcome { elapsed, diagnostics })
        } else if *cancel.borrow() {
            // An interrupt delivered to the process group can stop the encoder first
            progress.on_cancel("cancelled by user");
            Err(DomainError::Cancelled("cancelled by user".to_string()))
        } else {
            let text = diagnostics.join("\n");
            progress.on_error(&text);
            Err(DomainError::ExternalFailure {
                exit_code: status.code(),
                diagnostics: text,
            })
        }
    }

    async fn list_encoders(&self) -> Result<String, DomainError> {
        self.query(&["-hide_banner", "-encoders"]).await
    }

    async fn engine_version(&self) -> Result<String, DomainError> {
        self.query(&["-version"]).await
    }
}

impl FFmpegAdapter {
    /// Run a short informational command and return its stdout
    async fn query(&self, args: &[&str]) -> Result<String, DomainError> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DomainError::ToolMissing(format!("{}: {}", self.program.display(), e)))?;
        if !output.status.success() {
            return Err(DomainError::ExternalFailure {
                exit_code: output.status.code(),
                diagnostics: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
