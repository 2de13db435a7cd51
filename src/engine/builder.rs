//! Translates an [`EffectPlan`] into a [`FilterGraph`] plus the input list
//! the graph refers to.
//!
//! Every source segment gets its own seeked input, so no stream is ever read
//! twice and the graph needs no split filters. Inputs are laid out as:
//! segments, thumbnail, intro clip, intro audio, logo.

use tracing::debug;

use super::command::InputSpec;
use super::graph::{DrawText, Filter, FilterGraph, FilterStage, StreamRef};
use crate::domain::model::Easing;
use crate::error::MontageResult;
use crate::planner::{
    EffectPlan, FrameSize, IntroClipPlacement, LogoPlacement, OverlayPlan, PanTrajectory, PlannedSegment, PrefixItem,
    TextAnimation, TextPlacement, ThumbnailPlacement,
};

pub const VIDEO_OUT: &str = "vout";
pub const AUDIO_OUT: &str = "aout";

const PIXEL_FORMAT: &str = "yuv420p";
const PULSE_SIZE_AMPLITUDE: f64 = 0.08;

/// Validated graph and the inputs it expects, in index order
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: FilterGraph,
    pub inputs: Vec<InputSpec>,
}

/// Builds filter graphs from effect plans
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    font_file: Option<String>,
}

impl GraphBuilder {
    pub fn new(font_file: Option<String>) -> Self {
        Self { font_file }
    }

    pub fn build(&self, plan: &EffectPlan) -> MontageResult<BuiltGraph> {
        plan.check_ordering()?;

        let mut inputs = Vec::new();
        let mut stages = Vec::new();
        let mut timeline = Vec::new();

        // Inputs 0..k are the segments, in presentation order
        for planned in &plan.segments {
            inputs.push(InputSpec::clip(
                planned.segment.source.clone(),
                planned.segment.start_seconds(),
                planned.segment.duration_seconds(),
            ));
        }

        for (n, item) in plan.prefix.iter().enumerate() {
            let index = inputs.len();
            let label = format!("pre{}", n);
            let stage = match item {
                PrefixItem::Thumbnail(thumb) => {
                    inputs.push(InputSpec::still(thumb.path.clone(), thumb.duration, plan.fps));
                    thumbnail_stage(index, thumb, plan, &label)
                }
                PrefixItem::IntroClip(clip) => {
                    inputs.push(InputSpec::limited(clip.path.clone(), clip.length));
                    intro_clip_stage(index, clip, plan, &label)
                }
            };
            stages.push(stage);
            timeline.push(StreamRef::label(label));
        }

        for (n, planned) in plan.segments.iter().enumerate() {
            let label = format!("seg{}", n);
            stages.push(segment_stage(n, planned, plan, &label));
            timeline.push(StreamRef::label(label));
        }

        stages.push(FilterStage::new(
            "concat timeline",
            timeline.clone(),
            vec![Filter::Concat {
                count: timeline.len(),
                video: true,
            }],
            "base",
        ));
        let mut current = "base".to_string();

        let texts: Vec<&TextPlacement> = plan
            .overlays
            .iter()
            .filter_map(|o| match o {
                OverlayPlan::Text(t) => Some(t),
                OverlayPlan::Logo(_) => None,
            })
            .collect();
        if !texts.is_empty() {
            let filters = texts
                .iter()
                .flat_map(|t| self.text_filters(t))
                .collect();
            stages.push(FilterStage::new("text", vec![StreamRef::label(&current)], filters, "texts"));
            current = "texts".to_string();
        }

        let audio_out = if plan.has_audio() {
            Some(AUDIO_OUT.to_string())
        } else {
            None
        };
        let audio_stages = audio_stages(plan, &mut inputs);

        let logo = plan.overlays.iter().find_map(|o| match o {
            OverlayPlan::Logo(l) => Some(l),
            OverlayPlan::Text(_) => None,
        });
        match logo {
            Some(logo) => {
                let index = inputs.len();
                inputs.push(InputSpec::plain(logo.path.clone()));
                stages.extend(logo_stages(index, logo, &current));
            }
            None => stages.push(FilterStage::new(
                "output format",
                vec![StreamRef::label(&current)],
                vec![Filter::Format(PIXEL_FORMAT.to_string())],
                VIDEO_OUT,
            )),
        }
        stages.extend(audio_stages);

        let graph = FilterGraph {
            stages,
            input_count: inputs.len(),
            video_out: VIDEO_OUT.to_string(),
            audio_out,
        };
        graph.validate()?;
        debug!(stages = graph.stages.len(), inputs = inputs.len(), "Filter graph built");

        Ok(BuiltGraph { graph, inputs })
    }

    /// One drawtext per display window
    fn text_filters(&self, text: &TextPlacement) -> Vec<Filter> {
        text.windows
            .iter()
            .map(|window| {
                let (start, end) = (window.start, window.end);
                let (font_size, alpha) = match text.animation {
                    TextAnimation::Fade { seconds } => (
                        text.font_size.to_string(),
                        Some(format!(
                            "if(lt(t,{s:.3}+{f:.3}),(t-{s:.3})/{f:.3},if(gt(t,{e:.3}-{f:.3}),({e:.3}-t)/{f:.3},1))",
                            s = start,
                            e = end,
                            f = seconds
                        )),
                    ),
                    TextAnimation::Pulse { period } => (
                        format!(
                            "{}*(1+{}*sin(2*PI*t/{:.3}))",
                            text.font_size, PULSE_SIZE_AMPLITUDE, period
                        ),
                        Some(format!("0.75+0.25*sin(2*PI*t/{:.3})", period)),
                    ),
                    TextAnimation::Solid => (text.font_size.to_string(), None),
                };
                Filter::DrawText(DrawText {
                    text: text.text.clone(),
                    font_file: self.font_file.clone(),
                    font_size,
                    font_color: "white".to_string(),
                    border_width: text.border_width,
                    border_color: "black".to_string(),
                    box_color: text.box_opacity.map(|o| format!("black@{:.2}", o)),
                    x: "(w-text_w)/2".to_string(),
                    y: text.y.to_string(),
                    alpha,
                    enable: Some(format!("between(t,{:.3},{:.3})", start, end)),
                })
            })
            .collect()
    }
}

fn normalize(frame: FrameSize, fps: u32) -> Vec<Filter> {
    vec![
        Filter::Scale {
            width: frame.width,
            height: frame.height,
        },
        Filter::SetSar,
        Filter::Fps(fps),
        Filter::Format(PIXEL_FORMAT.to_string()),
    ]
}

fn segment_stage(n: usize, planned: &PlannedSegment, plan: &EffectPlan, label: &str) -> FilterStage {
    let crop = planned.reframe.crop;
    let duration = planned.segment.duration_seconds();
    let mut filters = vec![
        Filter::Trim { duration },
        Filter::SetPts("PTS-STARTPTS".to_string()),
        Filter::Fps(plan.fps),
        Filter::Crop {
            width: crop.width,
            height: crop.height,
            x: crop.x,
            y: crop.y,
        },
    ];
    match &planned.motion {
        Some(trajectory) => {
            filters.push(Filter::Scale {
                width: trajectory.canvas.width,
                height: trajectory.canvas.height,
            });
            filters.push(zoompan(trajectory, plan.frame, plan.fps, duration));
            filters.push(Filter::SetSar);
            filters.push(Filter::Format(PIXEL_FORMAT.to_string()));
        }
        None => filters.extend(normalize(plan.frame, plan.fps)),
    }
    FilterStage::new(format!("segment {}", n + 1), vec![StreamRef::video(n)], filters, label)
}

fn easing_expr(easing: Easing, p: &str) -> String {
    match easing {
        Easing::Linear => p.to_string(),
        Easing::EaseIn => format!("({p})*({p})", p = p),
        Easing::EaseOut => format!("({p})*(2-({p}))", p = p),
        Easing::EaseInOut => format!("({p})*({p})*(3-2*({p}))", p = p),
    }
}

/// Viewport interpolation driven by the output frame number
fn zoompan(trajectory: &PanTrajectory, frame: FrameSize, fps: u32, duration: f64) -> Filter {
    let progress = format!("min(1,{:.4}*on/({}*{:.3}))", trajectory.speed, fps, duration);
    let eased = easing_expr(trajectory.easing, &progress);
    let (start, end) = (trajectory.start, trajectory.end);
    let delta = |a: u32, b: u32| b as i64 - a as i64;

    Filter::ZoomPan {
        zoom: format!(
            "{}/({}+({})*{})",
            trajectory.canvas.width,
            start.width,
            delta(start.width, end.width),
            eased
        ),
        x: format!("{}+({})*{}", start.x, delta(start.x, end.x), eased),
        y: format!("{}+({})*{}", start.y, delta(start.y, end.y), eased),
        width: frame.width,
        height: frame.height,
        fps,
    }
}

fn thumbnail_stage(index: usize, thumb: &ThumbnailPlacement, plan: &EffectPlan, label: &str) -> FilterStage {
    let frame = plan.frame;
    let mut filters = vec![Filter::Scale {
        width: thumb.scaled.width,
        height: thumb.scaled.height,
    }];
    if let Some((x, y)) = thumb.pad {
        filters.push(Filter::Pad {
            width: frame.width,
            height: frame.height,
            x,
            y,
            color: "black".to_string(),
        });
    }
    if let Some(crop) = thumb.crop {
        filters.push(Filter::Crop {
            width: crop.width,
            height: crop.height,
            x: crop.x,
            y: crop.y,
        });
    }
    filters.extend([
        Filter::SetSar,
        Filter::Fps(plan.fps),
        Filter::Format(PIXEL_FORMAT.to_string()),
        Filter::Trim {
            duration: thumb.duration,
        },
        Filter::SetPts("PTS-STARTPTS".to_string()),
    ]);
    FilterStage::new("thumbnail", vec![StreamRef::video(index)], filters, label)
}

fn intro_clip_stage(index: usize, clip: &IntroClipPlacement, plan: &EffectPlan, label: &str) -> FilterStage {
    let crop = clip.reframe.crop;
    let mut filters = vec![
        Filter::Trim { duration: clip.length },
        Filter::SetPts("PTS-STARTPTS".to_string()),
        Filter::Crop {
            width: crop.width,
            height: crop.height,
            x: crop.x,
            y: crop.y,
        },
    ];
    filters.extend(normalize(plan.frame, plan.fps));
    FilterStage::new("intro clip", vec![StreamRef::video(index)], filters, label)
}

fn logo_stages(index: usize, logo: &LogoPlacement, base: &str) -> Vec<FilterStage> {
    vec![
        FilterStage::new(
            "logo scale",
            vec![StreamRef::video(index)],
            vec![
                Filter::Scale {
                    width: logo.width,
                    height: logo.height,
                },
                Filter::Format("rgba".to_string()),
            ],
            "logo",
        ),
        FilterStage::new(
            "logo overlay",
            vec![StreamRef::label(base), StreamRef::label("logo")],
            vec![
                Filter::Overlay { x: logo.x, y: logo.y },
                Filter::Format(PIXEL_FORMAT.to_string()),
            ],
            VIDEO_OUT,
        ),
    ]
}

/// Prefix audio (intro audio or silence) followed by the segments' audio.
/// Segments cut from a silent source get silence of the same length. Pushes the intro audio input if used.
fn audio_stages(plan: &EffectPlan, inputs: &mut Vec<InputSpec>) -> Vec<FilterStage> {
    if !plan.has_audio() {
        return Vec::new();
    }
    let mut stages = Vec::new();
    let mut pieces = Vec::new();
    let prefix = plan.prefix_duration();

    if let Some(intro) = &plan.prefix_audio {
        let index = inputs.len();
        inputs.push(InputSpec::limited(intro.path.clone(), intro.length));
        stages.push(FilterStage::new(
            "intro audio",
            vec![StreamRef::audio(index)],
            vec![
                Filter::ATrim { duration: intro.length },
                Filter::ASetPts("PTS-STARTPTS".to_string()),
                Filter::Volume(intro.volume),
                Filter::AFormat,
                Filter::APad {
                    whole_duration: intro.pad_to,
                },
            ],
            "apre",
        ));
        pieces.push(StreamRef::label("apre"));
    } else if prefix > 0.0 {
        stages.push(silence_stage("prefix silence", prefix, "apre"));
        pieces.push(StreamRef::label("apre"));
    }

    if plan.source_has_audio {
        for (n, planned) in plan.segments.iter().enumerate() {
            let label = format!("aseg{}", n);
            let duration = planned.segment.duration_seconds();
            if planned.has_audio {
                stages.push(FilterStage::new(
                    format!("segment {} audio", n + 1),
                    vec![StreamRef::audio(n)],
                    vec![
                        Filter::ATrim { duration },
                        Filter::ASetPts("PTS-STARTPTS".to_string()),
                        Filter::AFormat,
                    ],
                    label.as_str(),
                ));
            } else {
                stages.push(silence_stage(&format!("segment {} silence", n + 1), duration, &label));
            }
            pieces.push(StreamRef::label(label));
        }
    } else {
        stages.push(silence_stage("source silence", plan.main_duration, "amain"));
        pieces.push(StreamRef::label("amain"));
    }

    stages.push(FilterStage::new(
        "concat audio",
        pieces.clone(),
        vec![Filter::Concat {
            count: pieces.len(),
            video: false,
        }],
        AUDIO_OUT,
    ));
    stages
}

fn silence_stage(name: &str, duration: f64, label: &str) -> FilterStage {
    FilterStage::new(
        name,
        Vec::new(),
        vec![Filter::ANullSrc, Filter::ATrim { duration }, Filter::AFormat],
        label,
    )
}
