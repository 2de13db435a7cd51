//! Effect planning
//!
//! Produces an [`EffectPlan`]: everything the graph builder needs, with every
//! size, position and time window already resolved.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::motion::{MotionPlanner, PanTrajectory};
use super::overlays::{self, IntroAudioPlacement, IntroClipPlacement, LogoPlacement, TextPlacement, ThumbnailPlacement};
use super::{FrameSize, Reframe};
use crate::domain::model::*;
use crate::error::{MontageError, MontageResult};

/// Probed auxiliary inputs referenced by the output spec
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryAssets {
    pub logo: Option<MediaAsset>,
    pub thumbnail: Option<MediaAsset>,
    pub intro_video: Option<MediaAsset>,
    pub intro_audio: Option<MediaAsset>,
}

/// Item shown ahead of the first source segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrefixItem {
    Thumbnail(ThumbnailPlacement),
    IntroClip(IntroClipPlacement),
}

impl PrefixItem {
    pub fn duration(&self) -> f64 {
        match self {
            PrefixItem::Thumbnail(t) => t.duration,
            PrefixItem::IntroClip(c) => c.length,
        }
    }
}

/// One source segment with its reframing and optional motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSegment {
    pub segment: Segment,
    pub reframe: Reframe,
    pub motion: Option<PanTrajectory>,
    /// The segment's source carries an audio track
    pub has_audio: bool,
}

/// Overlay drawn over the concatenated timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayPlan {
    Text(TextPlacement),
    Logo(LogoPlacement),
}

/// Rendering stage, in the order stages must appear
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanStage {
    Prefix,
    Reframe,
    Motion,
    Text,
    Logo,
}

/// Fully resolved plan for one montage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPlan {
    pub frame: FrameSize,
    pub fps: u32,
    /// At least one segment's source carries audio
    pub source_has_audio: bool,
    pub prefix: Vec<PrefixItem>,
    pub prefix_audio: Option<IntroAudioPlacement>,
    /// Segments in presentation order
    pub segments: Vec<PlannedSegment>,
    /// Text overlays first, logo last
    pub overlays: Vec<OverlayPlan>,
    pub main_duration: f64,
}

impl EffectPlan {
    pub fn prefix_duration(&self) -> f64 {
        self.prefix.iter().map(PrefixItem::duration).sum()
    }

    pub fn total_duration(&self) -> f64 {
        self.prefix_duration() + self.main_duration
    }

    /// The output carries audio when the source or the intro does
    pub fn has_audio(&self) -> bool {
        self.source_has_audio || self.prefix_audio.is_some()
    }

    /// Stages in rendering order
    pub fn stages(&self) -> Vec<PlanStage> {
        let mut stages = Vec::new();
        if !self.prefix.is_empty() {
            stages.push(PlanStage::Prefix);
        }
        for planned in &self.segments {
            stages.push(PlanStage::Reframe);
            if planned.motion.is_some() {
                stages.push(PlanStage::Motion);
            }
        }
        for overlay in &self.overlays {
            stages.push(match overlay {
                OverlayPlan::Text(_) => PlanStage::Text,
                OverlayPlan::Logo(_) => PlanStage::Logo,
            });
        }
        stages
    }

    /// Verify prefix → (reframe → motion)* → text* → logo
    pub fn check_ordering(&self) -> MontageResult<()> {
        let stages = self.stages();
        let overlays_start = stages
            .iter()
            .position(|s| matches!(s, PlanStage::Text | PlanStage::Logo))
            .unwrap_or(stages.len());

        let (timeline, overlays) = stages.split_at(overlays_start);
        let prefix_ok = timeline
            .iter()
            .skip_while(|s| **s == PlanStage::Prefix)
            .all(|s| *s != PlanStage::Prefix);
        let motion_ok = timeline
            .iter()
            .enumerate()
            .all(|(i, s)| *s != PlanStage::Motion || (i > 0 && timeline[i - 1] == PlanStage::Reframe));
        let overlays_ok = overlays.windows(2).all(|w| w[0] <= w[1])
            && overlays.iter().filter(|s| **s == PlanStage::Logo).count() <= 1;

        if prefix_ok && motion_ok && overlays_ok {
            Ok(())
        } else {
            Err(MontageError::build(format!("Effect stages out of order: {:?}", stages)))
        }
    }
}

/// Computes per-segment and per-overlay parameters
pub struct EffectPlanner {
    fps: u32,
    seed: Option<u64>,
}

impl EffectPlanner {
    pub fn new(fps: u32, seed: Option<u64>) -> Self {
        Self { fps, seed }
    }

    /// Plan effects for `segments` in selection order. Every segment's
    /// source must be among `sources`.
    pub fn plan(
        &self,
        segments: &[Segment],
        sources: &[MediaAsset],
        spec: &OutputSpec,
        aux: &AuxiliaryAssets,
    ) -> MontageResult<EffectPlan> {
        if segments.is_empty() {
            return Err(MontageError::plan("No segments to plan"));
        }
        let frame = FrameSize::new(spec.format.width(), spec.format.height());
        let origins = segments
            .iter()
            .map(|segment| {
                sources
                    .iter()
                    .find(|asset| asset.path == segment.source)
                    .ok_or_else(|| {
                        MontageError::plan(format!("Segment source {} was not probed", segment.source.display()))
                    })
            })
            .collect::<MontageResult<Vec<&MediaAsset>>>()?;
        let main_duration = segments.iter().map(|s| s.duration_seconds()).sum::<f64>();

        let prefix = Self::plan_prefix(spec, aux, frame)?;
        let prefix_duration: f64 = prefix.iter().map(PrefixItem::duration).sum();
        let prefix_audio = match (&spec.intro.audio, &aux.intro_audio) {
            (Some(audio_spec), Some(asset)) if prefix_duration > 0.0 => {
                Some(overlays::plan_intro_audio(audio_spec, asset, prefix_duration))
            }
            (Some(_), _) => {
                return Err(MontageError::plan("Intro audio needs a thumbnail or intro video to play over"));
            }
            _ => None,
        };

        let mut motion = MotionPlanner::new(spec.pan.clone(), self.seed);
        let order = motion.presentation_order(segments.len());
        let directions = if spec.pan.enabled {
            Some(motion.directions(segments.len()))
        } else {
            None
        };

        let planned: Vec<PlannedSegment> = order
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let origin = origins[index];
                PlannedSegment {
                    segment: segments[index].clone(),
                    reframe: Reframe::compute(FrameSize::new(origin.width, origin.height), frame),
                    motion: directions
                        .as_ref()
                        .map(|d| motion.trajectory(d[position], frame)),
                    has_audio: origin.has_audio,
                }
            })
            .collect();

        let mut overlay_plans: Vec<OverlayPlan> =
            overlays::plan_texts(&spec.texts, frame, prefix_duration, main_duration)?
                .into_iter()
                .map(OverlayPlan::Text)
                .collect();
        if let Some(logo_spec) = &spec.logo {
            let asset = aux
                .logo
                .as_ref()
                .ok_or_else(|| MontageError::plan("Logo was requested but not probed"))?;
            overlay_plans.push(OverlayPlan::Logo(overlays::plan_logo(logo_spec, asset, frame)?));
        }

        let plan = EffectPlan {
            frame,
            fps: self.fps,
            source_has_audio: origins.iter().any(|o| o.has_audio),
            prefix,
            prefix_audio,
            segments: planned,
            overlays: overlay_plans,
            main_duration,
        };
        plan.check_ordering()?;

        info!(
            format = %spec.format,
            segments = plan.segments.len(),
            overlays = plan.overlays.len(),
            prefix_seconds = prefix_duration,
            crop = ?plan.segments[0].reframe.crop,
            "Effects planned"
        );
        debug!(stages = ?plan.stages(), "Plan stage order");
        Ok(plan)
    }

    /// Thumbnail first, then the intro clip
    fn plan_prefix(spec: &OutputSpec, aux: &AuxiliaryAssets, frame: FrameSize) -> MontageResult<Vec<PrefixItem>> {
        let mut prefix = Vec::new();
        if let Some(thumbnail_spec) = &spec.thumbnail {
            let image = aux
                .thumbnail
                .as_ref()
                .ok_or_else(|| MontageError::plan("Thumbnail was requested but not probed"))?;
            prefix.push(PrefixItem::Thumbnail(overlays::plan_thumbnail(thumbnail_spec, image, frame)));
        }
        if let Some(video_spec) = &spec.intro.video {
            let clip = aux
                .intro_video
                .as_ref()
                .ok_or_else(|| MontageError::plan("Intro video was requested but not probed"))?;
            prefix.push(PrefixItem::IntroClip(overlays::plan_intro_clip(video_spec, clip, frame)));
        }
        Ok(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Vec<MediaAsset> {
        vec![MediaAsset::new("in.mp4", MediaKind::Video, 600.0, 1920, 1080, true).unwrap()]
    }

    fn segments() -> Vec<Segment> {
        vec![
            Segment::new("in.mp4", 10_000, 10_000, 600_000).unwrap(),
            Segment::new("in.mp4", 100_000, 10_000, 600_000).unwrap(),
            Segment::new("in.mp4", 300_000, 10_000, 600_000).unwrap(),
        ]
    }

    fn full_spec() -> (OutputSpec, AuxiliaryAssets) {
        let mut spec = OutputSpec::new("out.mp4", TargetFormat::InstagramSquare, 30.0);
        spec.pan.enabled = true;
        spec.texts.push(TextOverlay {
            text: "hello".to_string(),
            style: TextStyle::Pulse,
        });
        spec.logo = Some(LogoSpec {
            path: "logo.png".into(),
            width_fraction: 0.3,
            position: 0.2,
        });
        spec.thumbnail = Some(ThumbnailSpec {
            path: "thumb.jpg".into(),
            duration: 3.0,
            scale_mode: ScaleMode::Fit,
        });
        let aux = AuxiliaryAssets {
            logo: Some(MediaAsset::new("logo.png", MediaKind::Image, 0.0, 400, 200, false).unwrap()),
            thumbnail: Some(MediaAsset::new("thumb.jpg", MediaKind::Image, 0.0, 1280, 720, false).unwrap()),
            ..AuxiliaryAssets::default()
        };
        (spec, aux)
    }

    #[test]
    fn test_square_target_crops_center() {
        let spec = OutputSpec::new("out.mp4", TargetFormat::InstagramSquare, 30.0);
        let plan = EffectPlanner::new(30, None)
            .plan(&segments(), &source(), &spec, &AuxiliaryAssets::default())
            .unwrap();
        for planned in &plan.segments {
            assert_eq!(planned.reframe.crop, crate::planner::Rect::new(420, 0, 1080, 1080));
            assert!(planned.motion.is_none());
        }
        assert_eq!(plan.stages(), vec![PlanStage::Reframe; 3]);
    }

    #[test]
    fn test_full_plan_ordering() {
        let (spec, aux) = full_spec();
        let plan = EffectPlanner::new(30, Some(7)).plan(&segments(), &source(), &spec, &aux).unwrap();
        let stages = plan.stages();
        assert_eq!(stages.first(), Some(&PlanStage::Prefix));
        assert_eq!(stages.last(), Some(&PlanStage::Logo));
        assert_eq!(stages[stages.len() - 2], PlanStage::Text);
        assert_eq!(plan.prefix_duration(), 3.0);
        assert_eq!(plan.total_duration(), 33.0);
        assert!(plan.check_ordering().is_ok());
        if let OverlayPlan::Text(text) = &plan.overlays[0] {
            assert_eq!(text.windows[0].start, 3.0);
        } else {
            panic!("text overlay expected first");
        }
    }

    #[test]
    fn test_planning_is_idempotent() {
        let (spec, aux) = full_spec();
        let planner = EffectPlanner::new(30, None);
        let a = planner.plan(&segments(), &source(), &spec, &aux).unwrap();
        let b = planner.plan(&segments(), &source(), &spec, &aux).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_strategy_shuffles_with_seed() {
        let (mut spec, aux) = full_spec();
        spec.pan.strategy = PanStrategy::Random;
        let planner = EffectPlanner::new(30, Some(99));
        let a = planner.plan(&segments(), &source(), &spec, &aux).unwrap();
        let b = planner.plan(&segments(), &source(), &spec, &aux).unwrap();
        assert_eq!(a, b);
        let mut starts: Vec<u64> = a.segments.iter().map(|p| p.segment.start_ms).collect();
        starts.sort_unstable();
        assert_eq!(starts, vec![10_000, 100_000, 300_000]);
    }

    #[test]
    fn test_out_of_order_overlays_rejected() {
        let (spec, aux) = full_spec();
        let mut plan = EffectPlanner::new(30, None).plan(&segments(), &source(), &spec, &aux).unwrap();
        plan.overlays.reverse();
        let err = plan.check_ordering().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Build);
    }

    #[test]
    fn test_each_segment_reframed_from_its_own_source() {
        let sources = vec![
            MediaAsset::new("wide.mp4", MediaKind::Video, 120.0, 1920, 1080, false).unwrap(),
            MediaAsset::new("tall.mp4", MediaKind::Video, 120.0, 1080, 1920, true).unwrap(),
        ];
        let segments = vec![
            Segment::new("wide.mp4", 0, 10_000, 120_000).unwrap(),
            Segment::new("tall.mp4", 50_000, 10_000, 120_000).unwrap(),
        ];
        let spec = OutputSpec::new("out.mp4", TargetFormat::InstagramSquare, 20.0);
        let plan = EffectPlanner::new(30, None)
            .plan(&segments, &sources, &spec, &AuxiliaryAssets::default())
            .unwrap();

        assert_eq!(plan.segments[0].reframe.crop, crate::planner::Rect::new(420, 0, 1080, 1080));
        assert_eq!(plan.segments[1].reframe.crop, crate::planner::Rect::new(0, 420, 1080, 1080));
        assert!(!plan.segments[0].has_audio);
        assert!(plan.segments[1].has_audio);
        assert!(plan.has_audio());
    }

    #[test]
    fn test_unknown_segment_source_is_plan_error() {
        let segments = vec![Segment::new("other.mp4", 0, 10_000, 60_000).unwrap()];
        let spec = OutputSpec::new("out.mp4", TargetFormat::Tiktok, 10.0);
        let err = EffectPlanner::new(30, None)
            .plan(&segments, &source(), &spec, &AuxiliaryAssets::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Plan);
    }

    #[test]
    fn test_intro_audio_without_prefix_is_plan_error() {
        let mut spec = OutputSpec::new("out.mp4", TargetFormat::Tiktok, 30.0);
        spec.intro.audio = Some(IntroAudioSpec {
            path: "jingle.mp3".into(),
            duration: 5.0,
            volume: 1.0,
        });
        let aux = AuxiliaryAssets {
            intro_audio: Some(MediaAsset::new("jingle.mp3", MediaKind::Audio, 8.0, 0, 0, true).unwrap()),
            ..AuxiliaryAssets::default()
        };
        let err = EffectPlanner::new(30, None)
            .plan(&segments(), &source(), &spec, &aux)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Plan);
    }
}
