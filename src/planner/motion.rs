//! Pan and zoom trajectories
//!
//! The reframed W×H picture is upscaled onto a canvas `(1 + distance)` times
//! larger. A W:H viewport then travels across (or zooms within) that canvas.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{even, FrameSize, Rect};
use crate::domain::model::{Easing, PanConfig, PanStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    ZoomIn,
    ZoomOut,
}

const TRANSLATIONS: [PanDirection; 4] = [
    PanDirection::LeftToRight,
    PanDirection::RightToLeft,
    PanDirection::TopToBottom,
    PanDirection::BottomToTop,
];

/// Viewport motion for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanTrajectory {
    pub direction: PanDirection,
    pub canvas: FrameSize,
    pub start: Rect,
    pub end: Rect,
    pub easing: Easing,
    pub speed: f64,
}

impl PanTrajectory {
    /// Build the trajectory for `direction` over a `frame`-sized output
    pub fn new(direction: PanDirection, frame: FrameSize, config: &PanConfig) -> Self {
        let canvas = FrameSize::new(
            even(frame.width as f64 * (1.0 + config.distance)).max(frame.width),
            even(frame.height as f64 * (1.0 + config.distance)).max(frame.height),
        );
        let slack_x = canvas.width - frame.width;
        let slack_y = canvas.height - frame.height;
        let center_x = slack_x / 2;
        let center_y = slack_y / 2;
        let view = |x, y| Rect::new(x, y, frame.width, frame.height);

        let (start, end) = match direction {
            PanDirection::LeftToRight => (view(0, center_y), view(slack_x, center_y)),
            PanDirection::RightToLeft => (view(slack_x, center_y), view(0, center_y)),
            PanDirection::TopToBottom => (view(center_x, 0), view(center_x, slack_y)),
            PanDirection::BottomToTop => (view(center_x, slack_y), view(center_x, 0)),
            PanDirection::ZoomIn => (Rect::full(canvas), view(center_x, center_y)),
            PanDirection::ZoomOut => (view(center_x, center_y), Rect::full(canvas)),
        };

        Self {
            direction,
            canvas,
            start: start.clamp_to(canvas),
            end: end.clamp_to(canvas),
            easing: config.easing,
            speed: config.speed,
        }
    }

    /// Eased progress at `elapsed` seconds into a segment of `duration` seconds
    pub fn progress(&self, elapsed: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 1.0;
        }
        let u = (self.speed * elapsed / duration).clamp(0.0, 1.0);
        self.easing.apply(u)
    }

    /// Viewport at eased progress `p`
    pub fn rect_at(&self, p: f64) -> Rect {
        let lerp = |a: u32, b: u32| (a as f64 + (b as f64 - a as f64) * p.clamp(0.0, 1.0)).round() as u32;
        Rect::new(
            lerp(self.start.x, self.end.x),
            lerp(self.start.y, self.end.y),
            lerp(self.start.width, self.end.width),
            lerp(self.start.height, self.end.height),
        )
        .clamp_to(self.canvas)
    }
}

/// Assigns a direction to every segment and fixes presentation order
pub struct MotionPlanner {
    config: PanConfig,
    rng: StdRng,
}

impl MotionPlanner {
    /// Create a planner; `seed` makes the random strategy reproducible
    pub fn new(config: PanConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    /// Direction for each of `count` segments
    pub fn directions(&mut self, count: usize) -> Vec<PanDirection> {
        match self.config.strategy {
            PanStrategy::Sequence => (0..count).map(|i| TRANSLATIONS[i % TRANSLATIONS.len()]).collect(),
            PanStrategy::Random => (0..count)
                .map(|_| TRANSLATIONS[self.rng.random_range(0..TRANSLATIONS.len())])
                .collect(),
            PanStrategy::ZoomIn => vec![PanDirection::ZoomIn; count],
            PanStrategy::ZoomOut => vec![PanDirection::ZoomOut; count],
        }
    }

    /// Indices of the chronological segments in the order they are shown
    pub fn presentation_order(&mut self, count: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..count).collect();
        if self.config.enabled && self.config.strategy == PanStrategy::Random {
            order.shuffle(&mut self.rng);
            debug!(?order, "Shuffled presentation order");
        }
        order
    }

    pub fn trajectory(&self, direction: PanDirection, frame: FrameSize) -> PanTrajectory {
        PanTrajectory::new(direction, frame, &self.config)
    }
}
