// Inspect interactor - Describes a source and its loudest moments

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::domain::model::*;
use crate::error::MontageResult;
use crate::ports::*;
use crate::probe::{EnergyAnalyzer, MediaProber};
use crate::utils::format_hms;

/// What `inspect` reports about a source
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub asset: MediaAsset,
    pub category: DurationCategory,
    /// Energy windows sorted loudest first
    pub loudest: Vec<EnergySample>,
    pub window: f64,
    pub flat_energy: bool,
}

impl InspectReport {
    /// Plain-text rendering for the console
    pub fn summary(&self) -> String {
        let asset = &self.asset;
        let mut out = format!(
            "File: {}\nDuration: {} ({})\nResolution: {}x{} ({:?})\nAudio: {}\n",
            asset.path.display(),
            format_hms(asset.duration),
            self.category,
            asset.width,
            asset.height,
            asset.orientation,
            if asset.has_audio { "yes" } else { "no" }
        );
        if self.flat_energy {
            out.push_str("Energy: uniform (no usable audio)\n");
        } else {
            out.push_str("Loudest windows:\n");
            for sample in &self.loudest {
                out.push_str(&format!(
                    "  {} - {}  score {:.3}\n",
                    format_hms(sample.timestamp),
                    format_hms((sample.timestamp + self.window).min(asset.duration)),
                    sample.score
                ));
            }
        }
        out
    }
}

/// Interactor for source inspection
pub struct InspectInteractor {
    prober: MediaProber,
    analyzer: EnergyAnalyzer,
    window: f64,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>, audio_port: Arc<dyn AudioPort>, sample_rate: u32, window: f64) -> Self {
        Self {
            prober: MediaProber::new(probe_port),
            analyzer: EnergyAnalyzer::new(audio_port, sample_rate, window),
            window,
        }
    }

    /// Probe `path`, categorize it and list its `top` loudest windows
    pub async fn inspect(
        &self,
        path: &Path,
        top: usize,
        cancel: watch::Receiver<bool>,
    ) -> MontageResult<InspectReport> {
        let asset = self.prober.probe_as(path, MediaKind::Video).await?;
        let category = DurationCategory::categorize(asset.duration);
        let profile = self.analyzer.analyze(&asset, cancel).await?;

        info!(path = %path.display(), category = %category, "Source inspected");
        Ok(InspectReport {
            category,
            loudest: profile.loudest(top),
            window: self.window,
            flat_energy: profile.is_flat(),
            asset,
        })
    }
}
