//! Media probing and audio energy analysis

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaAsset, MediaKind};
use crate::error::{MontageError, MontageResult};
use crate::ports::{ProbePort, ProbeReport};

pub mod energy;

pub use energy::{EnergyAccumulator, EnergyAnalyzer};

/// Turns engine probe reports into validated media assets
pub struct MediaProber {
    port: Arc<dyn ProbePort>,
}

impl MediaProber {
    pub fn new(port: Arc<dyn ProbePort>) -> Self {
        Self { port }
    }

    /// Probe a file and require it to be of the given kind
    pub async fn probe_as(&self, path: &Path, expected: MediaKind) -> MontageResult<MediaAsset> {
        let asset = self.probe(path).await?;
        let compatible = match expected {
            // Any file with a video stream can serve as a still, any file with audio as audio
            MediaKind::Image => asset.kind != MediaKind::Audio,
            MediaKind::Audio => asset.has_audio,
            MediaKind::Video => asset.kind == MediaKind::Video,
        };
        if !compatible {
            return Err(MontageError::from_probe(
                &path.display().to_string(),
                DomainError::ProbeFail(format!("expected {:?} media, found {:?}", expected, asset.kind)),
            ));
        }
        Ok(asset)
    }

    /// Probe a file and classify it
    pub async fn probe(&self, path: &Path) -> MontageResult<MediaAsset> {
        let path_str = path.display().to_string();
        debug!(path = %path_str, "Probing media");

        let report = self
            .port
            .probe(path)
            .await
            .map_err(|e| MontageError::from_probe(&path_str, e))?;

        let asset = Self::asset_from_report(report).map_err(|e| MontageError::from_probe(&path_str, e))?;
        info!(
            path = %path_str,
            kind = ?asset.kind,
            duration = asset.duration,
            width = asset.width,
            height = asset.height,
            has_audio = asset.has_audio,
            "Media probed"
        );
        Ok(asset)
    }

    /// Classify a report and validate its duration and dimensions
    pub fn asset_from_report(report: ProbeReport) -> Result<MediaAsset, DomainError> {
        let kind = if report.is_still_image {
            MediaKind::Image
        } else if report.has_video {
            MediaKind::Video
        } else if report.has_audio {
            MediaKind::Audio
        } else {
            return Err(DomainError::ProbeFail(format!(
                "No audio or video streams in {}",
                report.path.display()
            )));
        };

        let duration = match kind {
            MediaKind::Image => report.duration.unwrap_or(0.0).max(0.0),
            _ => report.duration.unwrap_or(0.0),
        };

        MediaAsset::new(
            report.path,
            kind,
            duration,
            report.width.unwrap_or(0),
            report.height.unwrap_or(0),
            report.has_audio,
        )
    }
}
