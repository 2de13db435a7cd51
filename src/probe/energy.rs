//! Audio energy analysis
//!
//! Decodes the source audio to mono f32, computes the RMS of each fixed
//! window and normalizes the result so the loudest window scores 1.0.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{EnergyProfile, EnergySample, MediaAsset};
use crate::error::{MontageError, MontageResult};
use crate::ports::AudioPort;

/// Streaming RMS accumulator over fixed windows
#[derive(Debug)]
pub struct EnergyAccumulator {
    samples_per_window: usize,
    sum_sq: f64,
    count: usize,
    windows: Vec<f64>,
    total_samples: u64,
}

impl EnergyAccumulator {
    pub fn new(sample_rate: u32, window_seconds: f64) -> Self {
        let samples_per_window = ((sample_rate as f64) * window_seconds).round().max(1.0) as usize;
        Self {
            samples_per_window,
            sum_sq: 0.0,
            count: 0,
            windows: Vec::new(),
            total_samples: 0,
        }
    }

    /// Consume a chunk of samples
    pub fn push(&mut self, chunk: &[f32]) {
        for &sample in chunk {
            let s = sample as f64;
            self.sum_sq += s * s;
            self.count += 1;
            if self.count == self.samples_per_window {
                self.close_window();
            }
        }
        self.total_samples += chunk.len() as u64;
    }

    fn close_window(&mut self) {
        let rms = if self.count > 0 {
            (self.sum_sq / self.count as f64).sqrt()
        } else {
            0.0
        };
        self.windows.push(rms);
        self.sum_sq = 0.0;
        self.count = 0;
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Close the trailing partial window and build a profile covering `duration`.
    /// Windows beyond the decoded audio score zero.
    pub fn finish(mut self, window_seconds: f64, duration: f64) -> Result<EnergyProfile, DomainError> {
        if self.count > 0 {
            self.close_window();
        }

        let expected = (duration / window_seconds).ceil().max(1.0) as usize;
        self.windows.resize(expected, 0.0);

        let peak = self.windows.iter().cloned().fold(0.0_f64, f64::max);
        let samples = self
            .windows
            .iter()
            .enumerate()
            .map(|(i, rms)| EnergySample {
                timestamp: i as f64 * window_seconds,
                score: if peak > 0.0 { rms / peak } else { 0.0 },
            })
            .collect();

        EnergyProfile::new(samples, window_seconds, duration)
    }
}

/// Produces an energy profile for a source asset
pub struct EnergyAnalyzer {
    port: Arc<dyn AudioPort>,
    sample_rate: u32,
    window: f64,
}

impl EnergyAnalyzer {
    pub fn new(port: Arc<dyn AudioPort>, sample_rate: u32, window: f64) -> Self {
        Self {
            port,
            sample_rate,
            window,
        }
    }

    /// Analyze the asset's audio; a source without audio gets a flat profile
    pub async fn analyze(
        &self,
        asset: &MediaAsset,
        cancel: watch::Receiver<bool>,
    ) -> MontageResult<EnergyProfile> {
        let path_str = asset.path_str();

        if !asset.has_audio {
            info!(path = %path_str, "Source has no audio track, using uniform energy");
            return EnergyProfile::flat(asset.duration, self.window)
                .map_err(|e| MontageError::from_analysis(&path_str, e));
        }

        let mut accumulator = EnergyAccumulator::new(self.sample_rate, self.window);
        let decoded = {
            let mut sink = |chunk: &[f32]| accumulator.push(chunk);
            self.port
                .decode_mono(&asset.path, self.sample_rate, &mut sink, cancel)
                .await
                .map_err(|e| MontageError::from_analysis(&path_str, e))?
        };
        debug!(path = %path_str, samples = decoded, "Audio decoded");

        if decoded == 0 {
            warn!(path = %path_str, "Audio track decoded to zero samples, using uniform energy");
            return EnergyProfile::flat(asset.duration, self.window)
                .map_err(|e| MontageError::from_analysis(&path_str, e));
        }

        let profile = accumulator
            .finish(self.window, asset.duration)
            .map_err(|e| MontageError::from_analysis(&path_str, e))?;

        info!(
            path = %path_str,
            windows = profile.samples().len(),
            flat = profile.is_flat(),
            "Energy profile computed"
        );
        Ok(profile)
    }
}
