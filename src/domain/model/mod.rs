// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

pub mod output_spec;

pub use output_spec::*;

/// Kind of media file as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

/// Frame orientation derived from width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    /// Derive orientation from pixel dimensions
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Orientation::Landscape,
            std::cmp::Ordering::Less => Orientation::Portrait,
            std::cmp::Ordering::Equal => Orientation::Square,
        }
    }
}

/// A probed media file. Immutable once created by the prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Duration in seconds (zero for still images)
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub has_audio: bool,
}

impl MediaAsset {
    /// Create new media asset with validation
    pub fn new(
        path: impl Into<PathBuf>,
        kind: MediaKind,
        duration: f64,
        width: u32,
        height: u32,
        has_audio: bool,
    ) -> Result<Self, DomainError> {
        let path = path.into();
        if !duration.is_finite() || duration < 0.0 {
            return Err(DomainError::ProbeFail(format!(
                "Invalid duration {} for {}",
                duration,
                path.display()
            )));
        }
        match kind {
            MediaKind::Video | MediaKind::Audio if duration == 0.0 => {
                return Err(DomainError::ProbeFail(format!(
                    "Zero duration reported for {}",
                    path.display()
                )));
            }
            MediaKind::Video | MediaKind::Image if width == 0 || height == 0 => {
                return Err(DomainError::ProbeFail(format!(
                    "Zero dimensions reported for {}",
                    path.display()
                )));
            }
            _ => {}
        }

        Ok(Self {
            orientation: Orientation::from_dimensions(width, height),
            path,
            kind,
            duration,
            width,
            height,
            has_audio,
        })
    }

    /// Get aspect ratio (width / height)
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Duration category of a source video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    Short,
    Medium,
    MediumLong,
    Long,
    Invalid,
}

impl DurationCategory {
    /// Categorize a source by its duration in seconds
    pub fn categorize(duration: f64) -> Self {
        if (30.0..=60.0).contains(&duration) {
            DurationCategory::Short
        } else if duration > 60.0 && duration <= 300.0 {
            DurationCategory::Medium
        } else if duration > 300.0 && duration <= 1800.0 {
            DurationCategory::MediumLong
        } else if duration > 1800.0 && duration <= 3600.0 {
            DurationCategory::Long
        } else {
            DurationCategory::Invalid
        }
    }
}

impl fmt::Display for DurationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DurationCategory::Short => "short",
            DurationCategory::Medium => "medium",
            DurationCategory::MediumLong => "medium_long",
            DurationCategory::Long => "long",
            DurationCategory::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// One energy measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    /// Window start in seconds
    pub timestamp: f64,
    /// Non-negative relative loudness
    pub score: f64,
}

/// Time-indexed loudness signal covering the full source duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfile {
    samples: Vec<EnergySample>,
    /// Width of each sample window in seconds
    window: f64,
    /// Source duration covered by the profile
    duration: f64,
}

impl EnergyProfile {
    /// Create a profile; timestamps must be strictly increasing and scores non-negative
    pub fn new(samples: Vec<EnergySample>, window: f64, duration: f64) -> Result<Self, DomainError> {
        if window <= 0.0 || !window.is_finite() {
            return Err(DomainError::BadArgs("Energy window must be positive".to_string()));
        }
        if duration <= 0.0 || !duration.is_finite() {
            return Err(DomainError::BadArgs("Energy profile duration must be positive".to_string()));
        }
        for pair in samples.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(DomainError::BadArgs(
                    "Energy profile timestamps must increase monotonically".to_string(),
                ));
            }
        }
        if samples.iter().any(|s| !(s.score >= 0.0) || !s.score.is_finite()) {
            return Err(DomainError::BadArgs("Energy scores must be non-negative".to_string()));
        }
        Ok(Self {
            samples,
            window,
            duration,
        })
    }

    /// Uniform profile used when the source has no audio
    pub fn flat(duration: f64, window: f64) -> Result<Self, DomainError> {
        let count = (duration / window).ceil().max(1.0) as usize;
        let samples = (0..count)
            .map(|i| EnergySample {
                timestamp: i as f64 * window,
                score: 1.0,
            })
            .collect();
        Self::new(samples, window, duration)
    }

    pub fn samples(&self) -> &[EnergySample] {
        &self.samples
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// True when every sample carries the same score
    pub fn is_flat(&self) -> bool {
        match self.samples.first() {
            Some(first) => self
                .samples
                .iter()
                .all(|s| (s.score - first.score).abs() < f64::EPSILON),
            None => true,
        }
    }

    /// Samples sorted by descending score, earliest first on ties
    pub fn loudest(&self, count: usize) -> Vec<EnergySample> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal))
        });
        sorted.truncate(count);
        sorted
    }
}

/// A contiguous time range of the source. Times are whole milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_ms: u64,
    pub duration_ms: u64,
    pub source: PathBuf,
}

impl Segment {
    /// Create new segment with validation against the source duration
    pub fn new(
        source: impl AsRef<Path>,
        start_ms: u64,
        duration_ms: u64,
        source_duration_ms: u64,
    ) -> Result<Self, DomainError> {
        if duration_ms == 0 {
            return Err(DomainError::BadArgs("Segment duration must be positive".to_string()));
        }
        if start_ms + duration_ms > source_duration_ms {
            return Err(DomainError::OutOfRange(format!(
                "Segment {}ms+{}ms exceeds source duration {}ms",
                start_ms, duration_ms, source_duration_ms
            )));
        }
        Ok(Self {
            start_ms,
            duration_ms,
            source: source.as_ref().to_path_buf(),
        })
    }

    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// Check whether two segments share any instant
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start_ms < other.end_ms() && other.start_ms < self.end_ms()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} +{:.3}s",
            crate::utils::time::format_hms(self.start_seconds()),
            self.duration_seconds()
        )
    }
}

/// Convert seconds to whole milliseconds
pub fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}
