//! Video encoder selection

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::DomainError;

/// Hardware acceleration preference from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareAcceleration {
    /// Use a hardware encoder when the engine lists one
    #[default]
    Auto,
    /// Always encode in software
    Off,
}

impl HardwareAcceleration {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.to_lowercase().as_str() {
            "auto" | "on" | "true" => Ok(HardwareAcceleration::Auto),
            "off" | "none" | "false" | "software" => Ok(HardwareAcceleration::Off),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid hardware acceleration: {}. Valid values: auto, off",
                value
            ))),
        }
    }
}

/// Encoder the output is produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderChoice {
    /// libx264
    Software,
    /// NVIDIA NVENC
    Nvenc,
    /// Apple VideoToolbox
    VideoToolbox,
}

impl EncoderChoice {
    pub fn codec(&self) -> &'static str {
        match self {
            EncoderChoice::Software => "libx264",
            EncoderChoice::Nvenc => "h264_nvenc",
            EncoderChoice::VideoToolbox => "h264_videotoolbox",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, EncoderChoice::Software)
    }

    /// Codec and rate-control arguments
    pub fn args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            EncoderChoice::Software => &["-c:v", "libx264", "-preset", "medium", "-crf", "20"],
            EncoderChoice::Nvenc => &["-c:v", "h264_nvenc", "-preset", "p4", "-rc", "vbr", "-cq", "23"],
            EncoderChoice::VideoToolbox => &["-c:v", "h264_videotoolbox", "-b:v", "8M"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }

    /// Pick an encoder from the engine's `-encoders` listing.
    /// VideoToolbox is preferred on macOS, NVENC elsewhere.
    pub fn detect(listing: &str, os: &str, preference: HardwareAcceleration) -> Self {
        if preference == HardwareAcceleration::Off {
            return EncoderChoice::Software;
        }

        let available: Vec<&str> = listing
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let flags = parts.next()?;
                let name = parts.next()?;
                // Encoder rows start with a flag column such as "V....D"
                (flags.len() == 6 && flags.starts_with('V')).then_some(name)
            })
            .collect();
        let has = |name: &str| available.contains(&name);

        let choice = if os == "macos" && has("h264_videotoolbox") {
            EncoderChoice::VideoToolbox
        } else if has("h264_nvenc") {
            EncoderChoice::Nvenc
        } else {
            EncoderChoice::Software
        };
        info!(encoder = choice.codec(), os, "Video encoder selected");
        choice
    }
}

impl fmt::Display for EncoderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 V....D h264_videotoolbox    VideoToolbox H.264 Encoder (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_detect_prefers_videotoolbox_on_macos() {
        assert_eq!(
            EncoderChoice::detect(LISTING, "macos", HardwareAcceleration::Auto),
            EncoderChoice::VideoToolbox
        );
    }

    #[test]
    fn test_detect_nvenc_elsewhere() {
        assert_eq!(
            EncoderChoice::detect(LISTING, "linux", HardwareAcceleration::Auto),
            EncoderChoice::Nvenc
        );
    }

    #[test]
    fn test_detect_falls_back_to_software() {
        let listing = " V....D libx264  libx264 H.264\n";
        assert_eq!(
            EncoderChoice::detect(listing, "linux", HardwareAcceleration::Auto),
            EncoderChoice::Software
        );
        assert_eq!(
            EncoderChoice::detect(LISTING, "linux", HardwareAcceleration::Off),
            EncoderChoice::Software
        );
    }

    #[test]
    fn test_legend_lines_are_not_encoders() {
        // "V..... = Video" must not register an encoder named "="
        let listing = " V..... = Video\n";
        assert_eq!(
            EncoderChoice::detect(listing, "linux", HardwareAcceleration::Auto),
            EncoderChoice::Software
        );
    }

    #[test]
    fn test_encoder_args() {
        assert_eq!(
            EncoderChoice::Software.args(),
            vec!["-c:v", "libx264", "-preset", "medium", "-crf", "20"]
        );
        assert!(EncoderChoice::Nvenc.is_hardware());
        assert_eq!(HardwareAcceleration::parse("OFF").unwrap(), HardwareAcceleration::Off);
    }
}
