//! Command-line argument definitions

use std::path::{Path, PathBuf};

use clap::Args;
use clap_num::number_range;

use crate::config_initialization::FileConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::utils::path::{ensure_mp4_extension, resolve_output_path};

fn fps_range(s: &str) -> Result<u32, String> {
    number_range(s, 1, 120)
}

fn sample_rate_range(s: &str) -> Result<u32, String> {
    number_range(s, 1000, 192_000)
}

fn timeout_range(s: &str) -> Result<u64, String> {
    number_range(s, 1, 86_400)
}

fn top_range(s: &str) -> Result<usize, String> {
    number_range(s, 1, 100)
}

/// `--input-string "output_name, format, video1, video2, ..."`
#[derive(Debug, Clone, PartialEq)]
pub struct InputString {
    pub output: PathBuf,
    pub format: TargetFormat,
    pub videos: Vec<PathBuf>,
}

impl InputString {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = raw.trim().split(',').map(str::trim).collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(DomainError::BadArgs(
                "Input string must contain at least: output name, format, and one input video".to_string(),
            ));
        }
        Ok(Self {
            output: ensure_mp4_extension(Path::new(parts[0])),
            format: TargetFormat::parse(parts[1])?,
            videos: parts[2..].iter().map(PathBuf::from).collect(),
        })
    }
}

/// What the montage should look like
#[derive(Args, Debug, Clone)]
pub struct MontageArgs {
    /// Source video file path; repeat for several sources
    #[arg(short, long = "input")]
    pub inputs: Vec<PathBuf>,

    /// More source video files
    #[arg(value_name = "VIDEO")]
    pub videos: Vec<PathBuf>,

    /// Output name, format and sources in one string: "name, format, video1, video2, ..."
    #[arg(long, conflicts_with_all = ["inputs", "videos", "output", "format"])]
    pub input_string: Option<String>,

    /// Output file path (default: montage_<format>_<timestamp>.mp4 next to the source)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target format (instagram_reel, tiktok, vertical_portrait, instagram_square)
    #[arg(short, long, default_value = "instagram_reel")]
    pub format: String,

    /// Total length of the main timeline in seconds (5-90)
    #[arg(short, long, default_value_t = 30.0)]
    pub duration: f64,

    /// Preferred length of one segment in seconds (1-30)
    #[arg(long, default_value_t = 4.0)]
    pub segment_duration: f64,

    /// How many segments to use (few, some, lots)
    #[arg(long, default_value = "some")]
    pub segments: String,

    /// Enable simulated camera motion
    #[arg(long)]
    pub pan: bool,

    /// Pan direction strategy (sequence, random, zoom_in, zoom_out)
    #[arg(long, default_value = "sequence")]
    pub pan_strategy: String,

    /// Pan speed multiplier (0.1-3.0)
    #[arg(long, default_value_t = 1.0)]
    pub pan_speed: f64,

    /// Pan distance as a fraction of the frame (0.1-0.5)
    #[arg(long, default_value_t = 0.2)]
    pub pan_distance: f64,

    /// Pan easing curve (linear, ease_in, ease_out, ease_in_out)
    #[arg(long, default_value = "ease_in_out")]
    pub pan_easing: String,

    /// Text overlay; repeat for several lines
    #[arg(long = "text")]
    pub texts: Vec<String>,

    /// Style for each --text in order; the last one applies to the rest
    #[arg(long = "text-style")]
    pub text_styles: Vec<String>,

    /// Logo image path
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Logo width as a fraction of the frame width (0.05-1.0)
    #[arg(long, default_value_t = 0.30)]
    pub logo_width: f64,

    /// Logo distance from the top as a fraction of the frame height (0.0-0.95)
    #[arg(long, default_value_t = 0.20)]
    pub logo_position: f64,

    /// Still image shown before the montage
    #[arg(long)]
    pub thumbnail: Option<PathBuf>,

    /// Thumbnail display time in seconds (1-10)
    #[arg(long, default_value_t = 3.0)]
    pub thumbnail_duration: f64,

    /// How the thumbnail fills the frame (fit, fill)
    #[arg(long, default_value = "fit")]
    pub thumbnail_scale: String,

    /// Clip played before the montage
    #[arg(long)]
    pub intro_video: Option<PathBuf>,

    /// Maximum intro clip length in seconds (5-30)
    #[arg(long, default_value_t = 5.0)]
    pub intro_video_length: f64,

    /// Audio played over the thumbnail and intro clip
    #[arg(long)]
    pub intro_audio: Option<PathBuf>,

    /// Intro audio length in seconds (1-30)
    #[arg(long, default_value_t = 5.0)]
    pub intro_audio_duration: f64,

    /// Intro audio volume (0.0-2.0)
    #[arg(long, default_value_t = 1.0)]
    pub intro_audio_volume: f64,
}

impl MontageArgs {
    fn input_string(&self) -> Result<Option<InputString>, DomainError> {
        self.input_string.as_deref().map(InputString::parse).transpose()
    }

    /// Source videos from `--input-string`, or `-i` followed by the positional list
    pub fn sources(&self) -> Result<Vec<PathBuf>, DomainError> {
        let sources = match self.input_string()? {
            Some(parsed) => parsed.videos,
            None => self.inputs.iter().chain(&self.videos).cloned().collect(),
        };
        if sources.is_empty() {
            return Err(DomainError::BadArgs("At least one input video is required".to_string()));
        }
        Ok(sources)
    }

    /// Convert the raw flags into an output specification
    pub fn to_output_spec(&self) -> Result<OutputSpec, DomainError> {
        let (format, output) = match self.input_string()? {
            Some(parsed) => (parsed.format, Some(parsed.output)),
            None => (TargetFormat::parse(&self.format)?, self.output.clone()),
        };
        let sources = self.sources()?;
        let output_path = resolve_output_path(output.as_deref(), &sources[0], format);

        let mut spec = OutputSpec::new(output_path, format, self.duration);
        spec.segment_duration = self.segment_duration;
        spec.bucket = SegmentBucket::parse(&self.segments)?;
        spec.pan = PanConfig {
            enabled: self.pan,
            strategy: PanStrategy::parse(&self.pan_strategy)?,
            speed: self.pan_speed,
            distance: self.pan_distance,
            easing: Easing::parse(&self.pan_easing)?,
        };
        spec.texts = self.text_overlays()?;
        spec.logo = self.logo.as_ref().map(|path| LogoSpec {
            path: path.clone(),
            width_fraction: self.logo_width,
            position: self.logo_position,
        });
        spec.thumbnail = match &self.thumbnail {
            Some(path) => Some(ThumbnailSpec {
                path: path.clone(),
                duration: self.thumbnail_duration,
                scale_mode: ScaleMode::parse(&self.thumbnail_scale)?,
            }),
            None => None,
        };
        spec.intro = IntroSpec {
            video: self.intro_video.as_ref().map(|path| IntroVideoSpec {
                path: path.clone(),
                max_length: self.intro_video_length,
            }),
            audio: self.intro_audio.as_ref().map(|path| IntroAudioSpec {
                path: path.clone(),
                duration: self.intro_audio_duration,
                volume: self.intro_audio_volume,
            }),
        };
        Ok(spec)
    }

    fn text_overlays(&self) -> Result<Vec<TextOverlay>, DomainError> {
        if self.text_styles.len() > self.texts.len().max(1) {
            return Err(DomainError::BadArgs(format!(
                "{} text styles given for {} texts",
                self.text_styles.len(),
                self.texts.len()
            )));
        }
        self.texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let style = match self.text_styles.get(i).or_else(|| self.text_styles.last()) {
                    Some(style) => TextStyle::parse(style)?,
                    None => TextStyle::Default,
                };
                Ok(TextOverlay {
                    text: text.clone(),
                    style,
                })
            })
            .collect()
    }
}

/// Engine settings; each one overrides the environment and config file
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Path to the ffmpeg binary
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// Hardware encoding (auto, off)
    #[arg(long)]
    pub hardware: Option<String>,

    /// Kill the encoder after this many seconds
    #[arg(long, value_parser = timeout_range)]
    pub timeout: Option<u64>,

    /// Root directory for per-run scratch files
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Also write the filter graph to this file
    #[arg(long)]
    pub debug_filter_log: Option<PathBuf>,

    /// Seed for the random pan strategy
    #[arg(long)]
    pub seed: Option<u64>,

    /// Audio analysis sample rate in Hz
    #[arg(long, value_parser = sample_rate_range)]
    pub sample_rate: Option<u32>,

    /// Audio analysis window in seconds
    #[arg(long)]
    pub analysis_window: Option<f64>,

    /// Output frame rate
    #[arg(long, value_parser = fps_range)]
    pub fps: Option<u32>,

    /// Font file for text overlays
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Fail on sources shorter than 30 s or longer than an hour instead of warning
    #[arg(long)]
    pub strict_duration: bool,
}

impl EngineArgs {
    /// The CLI layer of the configuration hierarchy
    pub fn to_file_config(&self) -> FileConfig {
        FileConfig {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            hardware_acceleration: self.hardware.clone(),
            encode_timeout: self.timeout,
            work_dir: self.work_dir.clone(),
            debug_filter_log: self.debug_filter_log.clone(),
            seed: self.seed,
            sample_rate: self.sample_rate,
            analysis_window: self.analysis_window,
            fps: self.fps,
            font_file: self.font.clone(),
            strict_duration: self.strict_duration.then_some(true),
        }
    }
}

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub montage: MontageArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Report progress and the result as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub montage: MontageArgs,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of loudest windows to list
    #[arg(long, default_value_t = 5, value_parser = top_range)]
    pub top: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        montage: MontageArgs,
    }

    fn parse(args: &[&str]) -> MontageArgs {
        let mut argv = vec!["montage"];
        argv.extend_from_slice(args);
        Harness::parse_from(argv).montage
    }

    #[test]
    fn test_defaults_build_minimal_spec() {
        let spec = parse(&["-i", "talk.mp4", "-o", "out.mp4"]).to_output_spec().unwrap();
        assert_eq!(spec.format, TargetFormat::InstagramReel);
        assert_eq!(spec.total_duration, 30.0);
        assert_eq!(spec.segment_duration, 4.0);
        assert_eq!(spec.bucket, SegmentBucket::Some);
        assert!(!spec.pan.enabled);
        assert!(spec.texts.is_empty());
        assert!(spec.logo.is_none());
        assert_eq!(spec.output_path, PathBuf::from("out.mp4"));
    }

    #[test]
    fn test_text_styles_follow_texts() {
        let args = parse(&[
            "-i", "talk.mp4", "--text", "One", "--text", "Two", "--text", "Three", "--text-style", "impact",
            "--text-style", "pulse",
        ]);
        let spec = args.to_output_spec().unwrap();
        let styles: Vec<TextStyle> = spec.texts.iter().map(|t| t.style).collect();
        assert_eq!(styles, vec![TextStyle::Impact, TextStyle::Pulse, TextStyle::Pulse]);
    }

    #[test]
    fn test_overlays_and_intro() {
        let spec = parse(&[
            "-i",
            "talk.mp4",
            "--format",
            "instagram_square",
            "--logo",
            "logo.png",
            "--logo-width",
            "0.5",
            "--thumbnail",
            "cover.jpg",
            "--thumbnail-scale",
            "fill",
            "--intro-audio",
            "jingle.mp3",
            "--intro-audio-volume",
            "0.8",
            "--pan",
            "--pan-strategy",
            "zoom_in",
        ])
        .to_output_spec()
        .unwrap();

        assert_eq!(spec.format, TargetFormat::InstagramSquare);
        assert_eq!(spec.logo.as_ref().map(|l| l.width_fraction), Some(0.5));
        assert_eq!(spec.thumbnail.as_ref().map(|t| t.scale_mode), Some(ScaleMode::Fill));
        assert_eq!(spec.intro.audio.as_ref().map(|a| a.volume), Some(0.8));
        assert!(spec.pan.enabled);
        assert_eq!(spec.pan.strategy, PanStrategy::ZoomIn);
        assert!(spec.output_path.to_string_lossy().contains("montage_instagram_square_"));
    }

    #[test]
    fn test_unknown_enum_values_are_rejected() {
        assert!(parse(&["-i", "a.mp4", "--format", "youtube"]).to_output_spec().is_err());
        assert!(parse(&["-i", "a.mp4", "--segments", "many"]).to_output_spec().is_err());
        assert!(parse(&["-i", "a.mp4", "--text", "x", "--text-style", "bold"])
            .to_output_spec()
            .is_err());
    }

    #[test]
    fn test_several_sources() {
        let args = parse(&["-i", "a.mp4", "-i", "b.mp4", "c.mp4", "d.mp4", "-o", "out.mp4"]);
        let sources: Vec<String> = args
            .sources()
            .unwrap()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        assert_eq!(sources, vec!["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
    }

    #[test]
    fn test_no_sources_rejected() {
        let args = parse(&["-o", "out.mp4"]);
        assert!(matches!(args.sources(), Err(DomainError::BadArgs(_))));
        assert!(args.to_output_spec().is_err());
    }

    #[test]
    fn test_input_string() {
        let args = parse(&["--input-string", "promo, TikTok, one.mp4, two.mp4 ,three.mp4"]);
        let spec = args.to_output_spec().unwrap();
        assert_eq!(spec.output_path, PathBuf::from("promo.mp4"));
        assert_eq!(spec.format, TargetFormat::Tiktok);
        assert_eq!(args.sources().unwrap().len(), 3);

        let parsed = InputString::parse("clip.mp4, instagram_square, a.mp4").unwrap();
        assert_eq!(parsed.output, PathBuf::from("clip.mp4"));
        assert_eq!(parsed.videos, vec![PathBuf::from("a.mp4")]);
    }

    #[test]
    fn test_bad_input_string() {
        assert!(matches!(InputString::parse("promo, tiktok"), Err(DomainError::BadArgs(_))));
        assert!(InputString::parse("promo, youtube, a.mp4").is_err());
        assert!(InputString::parse("promo, tiktok, ").is_err());
    }

    #[test]
    fn test_input_string_conflicts_with_explicit_sources() {
        assert!(Harness::try_parse_from(["montage", "--input-string", "a, tiktok, b.mp4", "-i", "c.mp4"]).is_err());
        assert!(Harness::try_parse_from(["montage", "--input-string", "a, tiktok, b.mp4", "-f", "tiktok"]).is_err());
    }

    #[test]
    fn test_engine_layer() {
        #[derive(Parser)]
        struct EngineHarness {
            #[command(flatten)]
            engine: EngineArgs,
        }
        let layer = EngineHarness::parse_from(["montage", "--fps", "25", "--seed", "7", "--hardware", "off"])
            .engine
            .to_file_config();
        assert_eq!(layer.fps, Some(25));
        assert_eq!(layer.seed, Some(7));
        assert_eq!(layer.hardware_acceleration.as_deref(), Some("off"));

        assert!(EngineHarness::try_parse_from(["montage", "--fps", "500"]).is_err());

        let strict = EngineHarness::parse_from(["montage", "--strict-duration"]).engine.to_file_config();
        assert_eq!(strict.strict_duration, Some(true));
        assert_eq!(EngineHarness::parse_from(["montage"]).engine.to_file_config().strict_duration, None);
    }
}
