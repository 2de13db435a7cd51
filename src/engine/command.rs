//! Encoder command line assembly

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::encoder::EncoderChoice;

const AUDIO_BITRATE: &str = "192k";
const AUDIO_SAMPLE_RATE: &str = "44100";

/// One `-i` input with its per-input options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub path: PathBuf,
    /// Input-side seek in seconds
    pub seek: Option<f64>,
    /// Read at most this many seconds
    pub duration: Option<f64>,
    /// Loop a still image at this frame rate
    pub loop_fps: Option<u32>,
}

impl InputSpec {
    pub fn plain(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seek: None,
            duration: None,
            loop_fps: None,
        }
    }

    /// A window of a longer file
    pub fn clip(path: impl Into<PathBuf>, seek: f64, duration: f64) -> Self {
        Self {
            seek: Some(seek),
            duration: Some(duration),
            ..Self::plain(path)
        }
    }

    pub fn limited(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::plain(path)
        }
    }

    /// A still image turned into a stream of `duration` seconds
    pub fn still(path: impl Into<PathBuf>, duration: f64, fps: u32) -> Self {
        Self {
            duration: Some(duration),
            loop_fps: Some(fps),
            ..Self::plain(path)
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(fps) = self.loop_fps {
            args.extend(["-loop".to_string(), "1".to_string(), "-framerate".to_string(), fps.to_string()]);
        }
        if let Some(seek) = self.seek {
            args.push("-ss".to_string());
            args.push(format!("{:.3}", seek));
        }
        if let Some(duration) = self.duration {
            args.push("-t".to_string());
            args.push(format!("{:.3}", duration));
        }
        args.push("-i".to_string());
        args.push(self.path.to_string_lossy().to_string());
        args
    }
}

/// Engine release as reported by `-version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
}

impl EngineVersion {
    /// First release that reads option values from files with `-/option <path>`
    pub const OPTION_FILES: EngineVersion = EngineVersion { major: 7, minor: 0 };

    /// Parse the first line of the banner, e.g. `ffmpeg version 7.1.1 Copyright ...`
    /// or `ffmpeg version n6.0`. Snapshot builds (`N-113...`) have no release number.
    pub fn parse(banner: &str) -> Option<Self> {
        let line = banner.lines().next()?;
        let mut words = line.split_whitespace();
        words.find(|w| *w == "version")?;
        let release = words.next()?.trim_start_matches('n');
        let mut parts = release.split(|c: char| !c.is_ascii_digit());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some(Self { major, minor })
    }

    pub fn reads_option_files(&self) -> bool {
        *self >= Self::OPTION_FILES
    }
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Full encoder invocation for one montage
#[derive(Debug, Clone)]
pub struct EncodeCommand {
    inputs: Vec<InputSpec>,
    script: PathBuf,
    output: PathBuf,
    video_label: String,
    audio_label: Option<String>,
    encoder: EncoderChoice,
    fps: u32,
    duration: f64,
    threads: usize,
    version: Option<EngineVersion>,
}

impl EncodeCommand {
    /// `script` is the file holding the serialized filter graph
    pub fn new(inputs: Vec<InputSpec>, script: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs,
            script: script.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            video_label: "vout".to_string(),
            audio_label: None,
            encoder: EncoderChoice::Software,
            fps: 30,
            duration: 0.0,
            threads: num_cpus::get(),
            version: None,
        }
    }

    pub fn map_video(mut self, label: impl Into<String>) -> Self {
        self.video_label = label.into();
        self
    }

    pub fn map_audio(mut self, label: Option<String>) -> Self {
        self.audio_label = label;
        self
    }

    pub fn encoder(mut self, encoder: EncoderChoice) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Hard cap on the output length in seconds
    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Engine release the command targets; unknown releases get the legacy flags
    pub fn engine_version(mut self, version: Option<EngineVersion>) -> Self {
        self.version = version;
        self
    }

    /// Option that loads the filter graph from the script file
    pub fn script_flag(&self) -> &'static str {
        match self.version {
            Some(version) if version.reads_option_files() => "-/filter_complex",
            _ => "-filter_complex_script",
        }
    }

    pub fn encoder_choice(&self) -> EncoderChoice {
        self.encoder
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-nostats", "-progress", "pipe:2"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for input in &self.inputs {
            args.extend(input.args());
        }

        args.push(self.script_flag().to_string());
        args.push(self.script.to_string_lossy().to_string());
        args.push("-map".to_string());
        args.push(format!("[{}]", self.video_label));
        if let Some(audio) = &self.audio_label {
            args.push("-map".to_string());
            args.push(format!("[{}]", audio));
        }

        args.extend(self.encoder.args());
        args.extend([
            "-r".to_string(),
            self.fps.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        if self.audio_label.is_some() {
            args.extend(
                ["-c:a", "aac", "-b:a", AUDIO_BITRATE, "-ar", AUDIO_SAMPLE_RATE, "-ac", "2"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }
        args.extend([
            "-threads".to_string(),
            self.threads.to_string(),
            "-t".to_string(),
            format!("{:.3}", self.duration),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}
