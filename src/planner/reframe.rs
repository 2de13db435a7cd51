//! Aspect-ratio reframing

use serde::{Deserialize, Serialize};

use super::{even, FrameSize};

/// Pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn full(size: FrameSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Shrink and shift so the rectangle lies inside `bounds`
    pub fn clamp_to(&self, bounds: FrameSize) -> Self {
        let width = self.width.min(bounds.width);
        let height = self.height.min(bounds.height);
        Self {
            x: self.x.min(bounds.width - width),
            y: self.y.min(bounds.height - height),
            width,
            height,
        }
    }

    pub fn fits_in(&self, bounds: FrameSize) -> bool {
        self.x + self.width <= bounds.width && self.y + self.height <= bounds.height
    }
}

/// Centered crop followed by a scale to the target size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reframe {
    pub source: FrameSize,
    pub crop: Rect,
    pub target: FrameSize,
}

impl Reframe {
    /// Compute the largest centered crop of `source` with the aspect of `target`.
    /// Wider sources lose their sides, narrower ones their top and bottom.
    pub fn compute(source: FrameSize, target: FrameSize) -> Self {
        let lhs = source.width as u64 * target.height as u64;
        let rhs = target.width as u64 * source.height as u64;

        let crop = if lhs == rhs {
            Rect::full(source)
        } else if lhs > rhs {
            let width = even(source.height as f64 * target.width as f64 / target.height as f64).min(source.width);
            Rect::new((source.width - width) / 2, 0, width, source.height)
        } else {
            let height = even(source.width as f64 * target.height as f64 / target.width as f64).min(source.height);
            Rect::new(0, (source.height - height) / 2, source.width, height)
        };

        Self { source, crop, target }
    }

    pub fn is_identity_crop(&self) -> bool {
        self.crop == Rect::full(self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_to_square_crops_horizontally() {
        let reframe = Reframe::compute(FrameSize::new(1920, 1080), FrameSize::new(1080, 1080));
        assert_eq!(reframe.crop, Rect::new(420, 0, 1080, 1080));
    }

    #[test]
    fn test_landscape_to_vertical() {
        let reframe = Reframe::compute(FrameSize::new(1920, 1080), FrameSize::new(1080, 1920));
        // 1080 * 9 / 16 = 607.5, rounded down to even
        assert_eq!(reframe.crop.width, 606);
        assert_eq!(reframe.crop.height, 1080);
        assert_eq!(reframe.crop.x, 657);
    }

    #[test]
    fn test_tall_source_crops_vertically() {
        let reframe = Reframe::compute(FrameSize::new(1080, 2400), FrameSize::new(1080, 1920));
        assert_eq!(reframe.crop, Rect::new(0, 240, 1080, 1920));
    }

    #[test]
    fn test_equal_aspect_is_full_frame() {
        let reframe = Reframe::compute(FrameSize::new(720, 1280), FrameSize::new(1080, 1920));
        assert!(reframe.is_identity_crop());
        assert_eq!(reframe.crop, Rect::new(0, 0, 720, 1280));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let rect = Rect::new(900, 50, 400, 300).clamp_to(FrameSize::new(1000, 1000));
        assert_eq!(rect, Rect::new(600, 50, 400, 300));
        assert!(rect.fits_in(FrameSize::new(1000, 1000)));
    }
}
