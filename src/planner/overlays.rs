//! Overlay geometry and timing: text, logo, thumbnail and intro prefix

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{even, FrameSize, Rect, Reframe, TimeWindow};
use crate::domain::model::*;
use crate::error::{MontageError, MontageResult};

/// Seconds each default/pro text display stays on screen
const TEXT_DISPLAY_SECONDS: f64 = 3.0;
const TEXT_FADE_SECONDS: f64 = 0.5;
/// Top of the text block as a fraction of frame height
const TEXT_BLOCK_TOP: f64 = 0.70;
/// Lowest point the text block may reach
const TEXT_BLOCK_BOTTOM: f64 = 0.95;
const LINE_SPACING: f64 = 1.5;
const PULSE_PERIOD_SECONDS: f64 = 1.5;

/// Opacity behavior of a text display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnimation {
    /// Fade in and out at the window edges
    Fade { seconds: f64 },
    /// Opacity and size oscillate with the given period
    Pulse { period: f64 },
    /// Fully opaque for the whole window
    Solid,
}

/// A resolved text overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPlacement {
    pub text: String,
    pub style: TextStyle,
    pub font_size: u32,
    /// Top edge of the line; text is centered horizontally
    pub y: u32,
    pub border_width: u32,
    /// Background box opacity, when the style draws one
    pub box_opacity: Option<f64>,
    pub animation: TextAnimation,
    pub windows: Vec<TimeWindow>,
}

/// A resolved logo overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoPlacement {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// How a still image is mapped onto the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailPlacement {
    pub path: PathBuf,
    pub duration: f64,
    pub mode: ScaleMode,
    /// Size after scaling, before padding or cropping
    pub scaled: FrameSize,
    /// Offset of the scaled image inside the padded frame (fit)
    pub pad: Option<(u32, u32)>,
    /// Region of the scaled image kept (fill)
    pub crop: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntroClipPlacement {
    pub path: PathBuf,
    pub length: f64,
    pub reframe: Reframe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntroAudioPlacement {
    pub path: PathBuf,
    /// Seconds of the audio file that are used
    pub length: f64,
    pub volume: f64,
    /// Padded with silence up to this length
    pub pad_to: f64,
}

/// Plan text overlays for a main timeline of `main_duration` seconds
/// starting at `offset` on the output timeline.
pub fn plan_texts(
    texts: &[TextOverlay],
    frame: FrameSize,
    offset: f64,
    main_duration: f64,
) -> MontageResult<Vec<TextPlacement>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let height = frame.height as f64;
    let fonts: Vec<u32> = texts
        .iter()
        .map(|t| (height * t.style.font_fraction()).round().max(1.0) as u32)
        .collect();
    let lines: Vec<u32> = fonts.iter().map(|&f| (f as f64 * LINE_SPACING).round() as u32).collect();
    let block: u32 = lines.iter().sum();

    let bottom_limit = (height * TEXT_BLOCK_BOTTOM).round() as u32;
    if block > bottom_limit {
        return Err(MontageError::plan(format!(
            "{} text overlays need {}px but only {}px are available",
            texts.len(),
            block,
            bottom_limit
        )));
    }
    let top = ((height * TEXT_BLOCK_TOP).round() as u32).min(bottom_limit - block);

    let mut y = top;
    let mut placements = Vec::with_capacity(texts.len());
    for ((overlay, &font_size), &line) in texts.iter().zip(&fonts).zip(&lines) {
        placements.push(place_text(overlay, font_size, y, offset, main_duration));
        y += line;
    }
    Ok(placements)
}

fn place_text(overlay: &TextOverlay, font_size: u32, y: u32, offset: f64, main: f64) -> TextPlacement {
    let whole = vec![TimeWindow::new(offset, offset + main)];
    let border = (font_size / 18).max(2);

    let (text, border_width, box_opacity, animation, windows) = match overlay.style {
        TextStyle::Default | TextStyle::Pro => (
            overlay.text.clone(),
            border,
            None,
            TextAnimation::Fade {
                seconds: TEXT_FADE_SECONDS,
            },
            repeated_windows(offset, main),
        ),
        TextStyle::Pulse => (
            overlay.text.clone(),
            border,
            None,
            TextAnimation::Pulse {
                period: PULSE_PERIOD_SECONDS,
            },
            whole,
        ),
        TextStyle::Promo => (overlay.text.clone(), 0, Some(0.5), TextAnimation::Solid, whole),
        TextStyle::Impact => {
            let display = TEXT_DISPLAY_SECONDS.min(main / 2.0);
            (
                overlay.text.to_uppercase(),
                border * 2,
                None,
                TextAnimation::Solid,
                vec![
                    TimeWindow::new(offset, offset + display),
                    TimeWindow::new(offset + main - display, offset + main),
                ],
            )
        }
    };

    TextPlacement {
        text,
        style: overlay.style,
        font_size,
        y,
        border_width,
        box_opacity,
        animation,
        windows,
    }
}

/// 3 to 5 displays of 3 s, evenly spaced, merged where they would overlap
fn repeated_windows(offset: f64, main: f64) -> Vec<TimeWindow> {
    let count = ((main / 20.0).floor() as usize).clamp(3, 5);
    let interval = main / (count + 1) as f64;
    let display = TEXT_DISPLAY_SECONDS.min(main);

    let mut windows: Vec<TimeWindow> = Vec::with_capacity(count);
    for i in 0..count {
        let start = (interval * (i + 1) as f64).min(main - display);
        let window = TimeWindow::new(offset + start, offset + start + display);
        match windows.last_mut() {
            Some(last) if window.start <= last.end => last.end = last.end.max(window.end),
            _ => windows.push(window),
        }
    }
    windows
}

/// Scale the logo to a fraction of the frame width and center it horizontally
pub fn plan_logo(spec: &LogoSpec, logo: &MediaAsset, frame: FrameSize) -> MontageResult<LogoPlacement> {
    let width = (frame.width as f64 * spec.width_fraction).round() as u32;
    let aspect = logo.aspect_ratio();
    if width == 0 || aspect <= 0.0 {
        return Err(MontageError::plan(format!(
            "Logo {} cannot be scaled to {}px",
            spec.path.display(),
            width
        )));
    }
    let height = (width as f64 / aspect).round().max(1.0) as u32;
    let y = (frame.height as f64 * spec.position).round() as u32;

    if width > frame.width || y + height > frame.height {
        return Err(MontageError::plan(format!(
            "Logo of {}x{} at y={} does not fit a {}x{} frame",
            width, height, y, frame.width, frame.height
        )));
    }

    Ok(LogoPlacement {
        path: spec.path.clone(),
        width,
        height,
        x: (frame.width - width) / 2,
        y,
    })
}

/// Fit letterboxes the whole image, fill covers the frame and crops the excess
pub fn plan_thumbnail(spec: &ThumbnailSpec, image: &MediaAsset, frame: FrameSize) -> ThumbnailPlacement {
    let sx = frame.width as f64 / image.width as f64;
    let sy = frame.height as f64 / image.height as f64;

    let (scaled, pad, crop) = match spec.scale_mode {
        ScaleMode::Fit => {
            let scale = sx.min(sy);
            let scaled = FrameSize::new(
                even(image.width as f64 * scale).min(frame.width),
                even(image.height as f64 * scale).min(frame.height),
            );
            let offset = ((frame.width - scaled.width) / 2, (frame.height - scaled.height) / 2);
            (scaled, Some(offset), None)
        }
        ScaleMode::Fill => {
            let scale = sx.max(sy);
            let scaled = FrameSize::new(
                (image.width as f64 * scale).ceil().max(frame.width as f64) as u32,
                (image.height as f64 * scale).ceil().max(frame.height as f64) as u32,
            );
            let crop = Rect::new(
                (scaled.width - frame.width) / 2,
                (scaled.height - frame.height) / 2,
                frame.width,
                frame.height,
            );
            (scaled, None, Some(crop))
        }
    };

    ThumbnailPlacement {
        path: spec.path.clone(),
        duration: spec.duration,
        mode: spec.scale_mode,
        scaled,
        pad,
        crop,
    }
}

/// Trim the intro clip and reframe it like the source
pub fn plan_intro_clip(spec: &IntroVideoSpec, clip: &MediaAsset, frame: FrameSize) -> IntroClipPlacement {
    IntroClipPlacement {
        path: spec.path.clone(),
        length: spec.max_length.min(clip.duration),
        reframe: Reframe::compute(FrameSize::new(clip.width, clip.height), frame),
    }
}

pub fn plan_intro_audio(spec: &IntroAudioSpec, audio: &MediaAsset, prefix: f64) -> IntroAudioPlacement {
    IntroAudioPlacement {
        path: spec.path.clone(),
        length: spec.duration.min(prefix).min(audio.duration),
        volume: spec.volume,
        pad_to: prefix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> MediaAsset {
        MediaAsset::new("img.png", MediaKind::Image, 0.0, width, height, false).unwrap()
    }

    #[test]
    fn test_logo_thirty_percent_at_twenty_percent() {
        let spec = LogoSpec {
            path: "logo.png".into(),
            width_fraction: 0.30,
            position: 0.20,
        };
        let placement = plan_logo(&spec, &image(500, 250), FrameSize::new(1080, 1080)).unwrap();
        assert_eq!(placement.width, 324);
        assert_eq!(placement.height, 162);
        assert_eq!(placement.y, 216);
        assert_eq!(placement.x, 378);
    }

    #[test]
    fn test_logo_that_does_not_fit_is_plan_error() {
        let spec = LogoSpec {
            path: "tall.png".into(),
            width_fraction: 1.0,
            position: 0.9,
        };
        let err = plan_logo(&spec, &image(100, 400), FrameSize::new(1080, 1080)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Plan);
    }

    #[test]
    fn test_thumbnail_fill_crops_fit_pads() {
        let frame = FrameSize::new(1080, 1920);
        let mut spec = ThumbnailSpec {
            path: "thumb.jpg".into(),
            duration: 3.0,
            scale_mode: ScaleMode::Fill,
        };
        let fill = plan_thumbnail(&spec, &image(1280, 720), frame);
        assert!(fill.pad.is_none());
        let crop = fill.crop.unwrap();
        assert_eq!((crop.width, crop.height), (1080, 1920));
        assert_eq!(fill.scaled.height, 1920);
        assert!(fill.scaled.width > 1080);

        spec.scale_mode = ScaleMode::Fit;
        let fit = plan_thumbnail(&spec, &image(1280, 720), frame);
        assert!(fit.crop.is_none());
        assert_eq!(fit.scaled.width, 1080);
        assert_eq!(fit.scaled.height, 606);
        assert_eq!(fit.pad, Some((0, 657)));
    }

    #[test]
    fn test_default_text_repeats_with_fades() {
        let texts = vec![TextOverlay {
            text: "@studio".to_string(),
            style: TextStyle::Default,
        }];
        let placements = plan_texts(&texts, FrameSize::new(1080, 1920), 0.0, 80.0).unwrap();
        let windows = &placements[0].windows;
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0], TimeWindow::new(16.0, 19.0));
        assert!(windows.iter().all(|w| (w.duration() - 3.0).abs() < 1e-9));
        assert_eq!(placements[0].font_size, 67);
    }

    #[test]
    fn test_text_windows_shift_with_prefix() {
        let texts = vec![TextOverlay {
            text: "promo".to_string(),
            style: TextStyle::Promo,
        }];
        let placements = plan_texts(&texts, FrameSize::new(1080, 1080), 3.0, 30.0).unwrap();
        assert_eq!(placements[0].windows, vec![TimeWindow::new(3.0, 33.0)]);
        assert_eq!(placements[0].box_opacity, Some(0.5));
    }

    #[test]
    fn test_impact_is_uppercase_at_both_ends() {
        let texts = vec![TextOverlay {
            text: "big news".to_string(),
            style: TextStyle::Impact,
        }];
        let placements = plan_texts(&texts, FrameSize::new(1080, 1920), 0.0, 30.0).unwrap();
        assert_eq!(placements[0].text, "BIG NEWS");
        assert_eq!(
            placements[0].windows,
            vec![TimeWindow::new(0.0, 3.0), TimeWindow::new(27.0, 30.0)]
        );
    }

    #[test]
    fn test_stacked_texts_do_not_overlap() {
        let texts: Vec<TextOverlay> = [TextStyle::Impact, TextStyle::Pulse, TextStyle::Default]
            .iter()
            .map(|&style| TextOverlay {
                text: "line".to_string(),
                style,
            })
            .collect();
        let placements = plan_texts(&texts, FrameSize::new(1080, 1080), 0.0, 30.0).unwrap();
        for pair in placements.windows(2) {
            assert!(pair[0].y + pair[0].font_size <= pair[1].y);
        }
        let last = placements.last().unwrap();
        assert!(last.y + last.font_size <= 1080);
    }

    #[test]
    fn test_short_timeline_merges_text_windows() {
        let windows = repeated_windows(0.0, 5.0);
        assert_eq!(windows, vec![TimeWindow::new(1.25, 5.0)]);
    }

    #[test]
    fn test_intro_trimmed_to_configured_length() {
        let clip = MediaAsset::new("intro.mp4", MediaKind::Video, 12.0, 1920, 1080, true).unwrap();
        let spec = IntroVideoSpec {
            path: "intro.mp4".into(),
            max_length: 5.0,
        };
        let placement = plan_intro_clip(&spec, &clip, FrameSize::new(1080, 1920));
        assert_eq!(placement.length, 5.0);
        assert_eq!(placement.reframe.crop.height, 1080);
    }

    #[test]
    fn test_intro_audio_limited_by_prefix() {
        let audio = MediaAsset::new("jingle.mp3", MediaKind::Audio, 20.0, 0, 0, true).unwrap();
        let spec = IntroAudioSpec {
            path: "jingle.mp3".into(),
            duration: 10.0,
            volume: 0.8,
        };
        let placement = plan_intro_audio(&spec, &audio, 3.0);
        assert_eq!(placement.length, 3.0);
        assert_eq!(placement.pad_to, 3.0);
    }
}
