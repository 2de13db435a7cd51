// Output specification - What the user asked the montage to look like

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Target social-media format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    InstagramReel,
    Tiktok,
    VerticalPortrait,
    InstagramSquare,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 4] = [
        TargetFormat::InstagramReel,
        TargetFormat::Tiktok,
        TargetFormat::VerticalPortrait,
        TargetFormat::InstagramSquare,
    ];

    /// Parse format identifier from string
    pub fn parse(format_str: &str) -> Result<Self, DomainError> {
        match format_str.to_lowercase().as_str() {
            "instagram_reel" => Ok(TargetFormat::InstagramReel),
            "tiktok" => Ok(TargetFormat::Tiktok),
            "vertical_portrait" => Ok(TargetFormat::VerticalPortrait),
            "instagram_square" => Ok(TargetFormat::InstagramSquare),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid format: {}. Valid formats: instagram_reel, tiktok, vertical_portrait, instagram_square",
                format_str
            ))),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            TargetFormat::InstagramReel => "instagram_reel",
            TargetFormat::Tiktok => "tiktok",
            TargetFormat::VerticalPortrait => "vertical_portrait",
            TargetFormat::InstagramSquare => "instagram_square",
        }
    }

    /// Output pixel dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            TargetFormat::InstagramSquare => (1080, 1080),
            _ => (1080, 1920),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn description(&self) -> &'static str {
        match self {
            TargetFormat::InstagramReel => "Instagram Reel (9:16 vertical)",
            TargetFormat::Tiktok => "TikTok (9:16 vertical)",
            TargetFormat::VerticalPortrait => "Generic vertical portrait (9:16)",
            TargetFormat::InstagramSquare => "Instagram square post (1:1)",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Qualitative segment count bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentBucket {
    Few,
    Some,
    Lots,
}

impl SegmentBucket {
    pub fn parse(bucket_str: &str) -> Result<Self, DomainError> {
        match bucket_str.to_lowercase().as_str() {
            "few" => Ok(SegmentBucket::Few),
            "some" => Ok(SegmentBucket::Some),
            "lots" => Ok(SegmentBucket::Lots),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid segment bucket: {}. Valid buckets: few, some, lots",
                bucket_str
            ))),
        }
    }

    /// Inclusive segment count range (min, max)
    pub fn range(&self) -> (usize, usize) {
        match self {
            SegmentBucket::Few => (3, 7),
            SegmentBucket::Some => (6, 12),
            SegmentBucket::Lots => (10, 25),
        }
    }

    pub fn min(&self) -> usize {
        self.range().0
    }

    pub fn max(&self) -> usize {
        self.range().1
    }
}

impl fmt::Display for SegmentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentBucket::Few => "few",
            SegmentBucket::Some => "some",
            SegmentBucket::Lots => "lots",
        };
        f.write_str(name)
    }
}

/// How pan directions are chosen per segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanStrategy {
    Sequence,
    Random,
    ZoomIn,
    ZoomOut,
}

impl PanStrategy {
    pub fn parse(strategy_str: &str) -> Result<Self, DomainError> {
        match strategy_str.to_lowercase().as_str() {
            "sequence" => Ok(PanStrategy::Sequence),
            "random" => Ok(PanStrategy::Random),
            "zoom_in" => Ok(PanStrategy::ZoomIn),
            "zoom_out" => Ok(PanStrategy::ZoomOut),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid pan strategy: {}. Valid strategies: sequence, random, zoom_in, zoom_out",
                strategy_str
            ))),
        }
    }
}

/// Mapping from normalized time to normalized progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub fn parse(easing_str: &str) -> Result<Self, DomainError> {
        match easing_str.to_lowercase().as_str() {
            "linear" => Ok(Easing::Linear),
            "ease_in" => Ok(Easing::EaseIn),
            "ease_out" => Ok(Easing::EaseOut),
            "ease_in_out" => Ok(Easing::EaseInOut),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid easing: {}. Valid easings: linear, ease_in, ease_out, ease_in_out",
                easing_str
            ))),
        }
    }

    /// Evaluate the curve; input is clamped to [0, 1]
    pub fn apply(&self, t: f64) -> f64 {
        let u = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => u,
            Easing::EaseIn => u * u,
            Easing::EaseOut => u * (2.0 - u),
            Easing::EaseInOut => u * u * (3.0 - 2.0 * u),
        }
    }
}

/// Panning/zoom configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanConfig {
    pub enabled: bool,
    pub strategy: PanStrategy,
    pub speed: f64,
    pub distance: f64,
    pub easing: Easing,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: PanStrategy::Sequence,
            speed: 1.0,
            distance: 0.2,
            easing: Easing::EaseInOut,
        }
    }
}

/// Visual treatment of a text overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    Default,
    Pulse,
    Pro,
    Promo,
    Impact,
}

impl TextStyle {
    pub fn parse(style_str: &str) -> Result<Self, DomainError> {
        match style_str.to_lowercase().as_str() {
            "default" => Ok(TextStyle::Default),
            "pulse" => Ok(TextStyle::Pulse),
            "pro" => Ok(TextStyle::Pro),
            "promo" => Ok(TextStyle::Promo),
            "impact" => Ok(TextStyle::Impact),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid text style: {}. Valid styles: default, pulse, pro, promo, impact",
                style_str
            ))),
        }
    }

    /// Font size as a fraction of the target height
    pub fn font_fraction(&self) -> f64 {
        match self {
            TextStyle::Default => 0.035,
            TextStyle::Pro => 0.032,
            TextStyle::Pulse => 0.04,
            TextStyle::Promo => 0.045,
            TextStyle::Impact => 0.06,
        }
    }
}

/// One text entry with its style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub style: TextStyle,
}

/// Logo placement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoSpec {
    pub path: PathBuf,
    /// Logo width as a fraction of the target width
    pub width_fraction: f64,
    /// Distance from the top as a fraction of the target height
    pub position: f64,
}

/// How a still image is fitted to the target frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    Fit,
    Fill,
}

impl ScaleMode {
    pub fn parse(mode_str: &str) -> Result<Self, DomainError> {
        match mode_str.to_lowercase().as_str() {
            "fit" => Ok(ScaleMode::Fit),
            "fill" => Ok(ScaleMode::Fill),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid scale mode: {}. Valid modes: fit, fill",
                mode_str
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    pub path: PathBuf,
    pub duration: f64,
    pub scale_mode: ScaleMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntroVideoSpec {
    pub path: PathBuf,
    pub max_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntroAudioSpec {
    pub path: PathBuf,
    pub duration: f64,
    pub volume: f64,
}

/// Intro clip and/or intro audio placed ahead of the main timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroSpec {
    pub video: Option<IntroVideoSpec>,
    pub audio: Option<IntroAudioSpec>,
}

/// Everything the user asked for. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub output_path: PathBuf,
    pub format: TargetFormat,
    /// Requested main timeline length in seconds
    pub total_duration: f64,
    pub segment_duration: f64,
    pub bucket: SegmentBucket,
    pub pan: PanConfig,
    pub texts: Vec<TextOverlay>,
    pub logo: Option<LogoSpec>,
    pub thumbnail: Option<ThumbnailSpec>,
    pub intro: IntroSpec,
}

impl OutputSpec {
    /// Minimal spec with no overlays
    pub fn new(output_path: impl Into<PathBuf>, format: TargetFormat, total_duration: f64) -> Self {
        Self {
            output_path: output_path.into(),
            format,
            total_duration,
            segment_duration: 4.0,
            bucket: SegmentBucket::Some,
            pan: PanConfig::default(),
            texts: Vec::new(),
            logo: None,
            thumbnail: None,
            intro: IntroSpec::default(),
        }
    }

    pub fn has_prefix(&self) -> bool {
        self.thumbnail.is_some() || self.intro.video.is_some()
    }
}
