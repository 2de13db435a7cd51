//! Segment selection and effect planning module

use serde::{Deserialize, Serialize};

pub mod effects;
pub mod motion;
pub mod overlays;
pub mod reframe;
pub mod selector;

pub use effects::{AuxiliaryAssets, EffectPlan, EffectPlanner, OverlayPlan, PlanStage, PlannedSegment, PrefixItem};
pub use motion::{MotionPlanner, PanDirection, PanTrajectory};
pub use overlays::{
    IntroAudioPlacement, IntroClipPlacement, LogoPlacement, TextAnimation, TextPlacement, ThumbnailPlacement,
};
pub use reframe::{Rect, Reframe};
pub use selector::{FeasibilityWarning, SegmentSelector, Selection, SourceProfile};

/// Frame geometry of the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Round down to the nearest even value, never below 2
pub(crate) fn even(value: f64) -> u32 {
    let v = value.max(2.0).floor() as u32;
    v - (v % 2)
}

/// Time window on the output timeline, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
