// Domain rules - Validation policies applied at ingestion time

use crate::domain::errors::*;
use crate::domain::model::*;

/// Inclusive numeric range for one user-facing option
#[derive(Debug, Clone, Copy)]
pub struct OptionRange {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

impl OptionRange {
    pub const fn new(name: &'static str, min: f64, max: f64) -> Self {
        Self { name, min, max }
    }

    /// Reject values outside the range
    pub fn check(&self, value: f64) -> Result<(), DomainError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(DomainError::OutOfRange(format!(
                "{} must be between {} and {}, got {}",
                self.name, self.min, self.max, value
            )));
        }
        Ok(())
    }
}

pub const TOTAL_DURATION: OptionRange = OptionRange::new("duration", 5.0, 90.0);
pub const SEGMENT_DURATION: OptionRange = OptionRange::new("segment-duration", 1.0, 30.0);
pub const PAN_SPEED: OptionRange = OptionRange::new("pan-speed", 0.1, 3.0);
pub const PAN_DISTANCE: OptionRange = OptionRange::new("pan-distance", 0.1, 0.5);
pub const LOGO_WIDTH: OptionRange = OptionRange::new("logo-width", 0.05, 1.0);
pub const LOGO_POSITION: OptionRange = OptionRange::new("logo-position", 0.0, 0.95);
pub const THUMBNAIL_DURATION: OptionRange = OptionRange::new("thumbnail-duration", 1.0, 10.0);
pub const INTRO_VIDEO_LENGTH: OptionRange = OptionRange::new("intro-video-length", 5.0, 30.0);
pub const INTRO_AUDIO_DURATION: OptionRange = OptionRange::new("intro-audio-duration", 1.0, 30.0);
pub const INTRO_AUDIO_VOLUME: OptionRange = OptionRange::new("intro-audio-volume", 0.0, 2.0);

/// Fewest sources accepted when every source is a short clip
pub const MIN_SHORT_SOURCES: usize = 3;

/// Business rules for accepting an output specification
pub struct SpecValidator;

impl SpecValidator {
    /// Validate every numeric option and cross-option constraint
    pub fn validate(spec: &OutputSpec) -> Result<(), DomainError> {
        TOTAL_DURATION.check(spec.total_duration)?;
        SEGMENT_DURATION.check(spec.segment_duration)?;

        if spec.pan.enabled {
            PAN_SPEED.check(spec.pan.speed)?;
            PAN_DISTANCE.check(spec.pan.distance)?;
        }

        for overlay in &spec.texts {
            if overlay.text.trim().is_empty() {
                return Err(DomainError::BadArgs("Text overlay cannot be empty".to_string()));
            }
        }

        if let Some(logo) = &spec.logo {
            LOGO_WIDTH.check(logo.width_fraction)?;
            LOGO_POSITION.check(logo.position)?;
        }

        if let Some(thumbnail) = &spec.thumbnail {
            THUMBNAIL_DURATION.check(thumbnail.duration)?;
        }

        if let Some(video) = &spec.intro.video {
            INTRO_VIDEO_LENGTH.check(video.max_length)?;
        }

        if let Some(audio) = &spec.intro.audio {
            INTRO_AUDIO_DURATION.check(audio.duration)?;
            INTRO_AUDIO_VOLUME.check(audio.volume)?;
            if !spec.has_prefix() {
                return Err(DomainError::BadArgs(
                    "Intro audio requires a thumbnail or an intro video to play over".to_string(),
                ));
            }
        }

        Self::validate_inputs_distinct(spec)
    }

    /// The output must not overwrite any of the inputs
    fn validate_inputs_distinct(spec: &OutputSpec) -> Result<(), DomainError> {
        let mut inputs = Vec::new();
        if let Some(logo) = &spec.logo {
            inputs.push(&logo.path);
        }
        if let Some(thumbnail) = &spec.thumbnail {
            inputs.push(&thumbnail.path);
        }
        if let Some(video) = &spec.intro.video {
            inputs.push(&video.path);
        }
        if let Some(audio) = &spec.intro.audio {
            inputs.push(&audio.path);
        }
        if inputs.iter().any(|p| **p == spec.output_path) {
            return Err(DomainError::BadArgs(format!(
                "Output path {} would overwrite an input file",
                spec.output_path.display()
            )));
        }
        Ok(())
    }

    /// Check that the sources are long enough for the requested total
    pub fn validate_against_sources(spec: &OutputSpec, sources: &[MediaAsset]) -> Result<(), DomainError> {
        if let Some(source) = sources.iter().find(|s| s.path == spec.output_path) {
            return Err(DomainError::BadArgs(format!(
                "Output path {} would overwrite the source",
                source.path.display()
            )));
        }
        let combined: f64 = sources.iter().map(|s| s.duration).sum();
        if spec.total_duration > combined {
            let what = if sources.len() == 1 { "source" } else { "combined source" };
            return Err(DomainError::OutOfRange(format!(
                "Requested duration {:.1}s exceeds {} duration {:.1}s",
                spec.total_duration, what, combined
            )));
        }
        Ok(())
    }

    /// Source-set rules. Short clips only make a montage in numbers, and with
    /// `strict_duration` every source must fall in a duration category.
    pub fn validate_sources(sources: &[MediaAsset], strict_duration: bool) -> Result<(), DomainError> {
        if sources.is_empty() {
            return Err(DomainError::BadArgs("At least one input video is required".to_string()));
        }

        let categories: Vec<DurationCategory> = sources
            .iter()
            .map(|s| DurationCategory::categorize(s.duration))
            .collect();
        if categories.iter().all(|c| *c == DurationCategory::Short) && sources.len() < MIN_SHORT_SOURCES {
            return Err(DomainError::BadArgs(format!(
                "At least {} short videos are required. Only {} provided",
                MIN_SHORT_SOURCES,
                sources.len()
            )));
        }

        if strict_duration {
            let invalid: Vec<String> = sources
                .iter()
                .zip(&categories)
                .filter(|(_, c)| **c == DurationCategory::Invalid)
                .map(|(s, _)| format!("{} ({:.2}s)", s.path.display(), s.duration))
                .collect();
            if !invalid.is_empty() {
                return Err(DomainError::OutOfRange(format!(
                    "Some videos don't match the required durations: {}. Acceptable ranges: 30-3600 seconds",
                    invalid.join(", ")
                )));
            }
        }
        Ok(())
    }
}
