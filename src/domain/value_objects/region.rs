//! Region Value Object
//!
//! A padded, 4-aligned square crop fed to a neural detector. Unifies the
//! two region-sizing variants found in the source material
//! (`calculate_region` vs `calculate_face_region`) behind one primitive
//! parameterized by `min_side` and `multiplier`, per spec.md's Design Notes.

use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// A square region of interest in frame coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    bbox: BoundingBox,
}

impl Region {
    /// Rounds `n` up to the next multiple of 4.
    fn round_up_to_4(n: i32) -> i32 {
        (n + 3) & !3
    }

    /// Computes the minimum legal region side for a detector whose input
    /// tensor is `model_w x model_h`: `ceil(max(model_w, model_h) / 2)`
    /// rounded up to a multiple of 4 (spec.md §4.4).
    pub fn min_side(model_w: i32, model_h: i32) -> i32 {
        let half = (model_w.max(model_h) + 1) / 2;
        Self::round_up_to_4(half)
    }

    /// Builds a square Region around `source`, expanded by `multiplier`,
    /// with `side >= min_side`, a multiple of 4, clipped to the frame.
    ///
    /// This is the one primitive behind both `calculate_region` (object
    /// regions, multiplier 1.2) and `calculate_face_region` (face regions,
    /// a tighter multiplier) in the original source.
    pub fn from_box(
        source: &BoundingBox,
        frame_width: i32,
        frame_height: i32,
        multiplier: f32,
        min_side: i32,
    ) -> Region {
        let (cx, cy) = source.center();
        let raw_side = (source.width().max(source.height()) as f32 * multiplier) as i32;
        let side = Self::round_up_to_4(raw_side.max(min_side));

        let half = side / 2;
        let mut x0 = cx - half;
        let mut y0 = cy - half;
        let mut x1 = x0 + side;
        let mut y1 = y0 + side;

        // Shift (not shrink) to stay inside the frame; clipping the side
        // itself would break the "multiple of 4, >= min_side" invariant.
        if x0 < 0 {
            x1 -= x0;
            x0 = 0;
        }
        if y0 < 0 {
            y1 -= y0;
            y0 = 0;
        }
        if x1 > frame_width {
            let shift = x1 - frame_width;
            x0 = (x0 - shift).max(0);
            x1 = frame_width;
        }
        if y1 > frame_height {
            let shift = y1 - frame_height;
            y0 = (y0 - shift).max(0);
            y1 = frame_height;
        }

        Region {
            bbox: BoundingBox::from_corners(x0, y0, x1, y1),
        }
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn x0(&self) -> i32 {
        self.bbox.x()
    }

    pub fn y0(&self) -> i32 {
        self.bbox.y()
    }

    pub fn x1(&self) -> i32 {
        self.bbox.right()
    }

    pub fn y1(&self) -> i32 {
        self.bbox.bottom()
    }

    /// Side length of this (square) region.
    pub fn size(&self) -> i32 {
        self.bbox.right() - self.bbox.x()
    }

    /// Transforms a normalized `[0,1]` detector output box back into frame
    /// coordinates, per spec.md §4.5 step 6.
    pub fn denormalize(
        &self,
        ymin: f32,
        xmin: f32,
        ymax: f32,
        xmax: f32,
        frame_width: i32,
        frame_height: i32,
    ) -> BoundingBox {
        let size = self.size() as f32;
        let x0 = self.x0() as f32;
        let y0 = self.y0() as f32;

        let x_min = (xmin * size + x0).clamp(0.0, (frame_width - 1) as f32);
        let y_min = (ymin * size + y0).clamp(0.0, (frame_height - 1) as f32);
        let x_max = (xmax * size + x0).clamp(0.0, (frame_width - 1) as f32);
        let y_max = (ymax * size + y0).clamp(0.0, (frame_height - 1) as f32);

        BoundingBox::from_corners(x_min as i32, y_min as i32, x_max as i32, y_max as i32)
    }

    /// Re-normalizes a frame-coordinate box against this region — the
    /// inverse of `denormalize`, used to test the round-trip property in
    /// spec.md §8.
    pub fn normalize(&self, bbox: &BoundingBox) -> (f32, f32, f32, f32) {
        let size = self.size() as f32;
        let x0 = self.x0() as f32;
        let y0 = self.y0() as f32;

        let xmin = (bbox.x() as f32 - x0) / size;
        let ymin = (bbox.y() as f32 - y0) / size;
        let xmax = (bbox.right() as f32 - x0) / size;
        let ymax = (bbox.bottom() as f32 - y0) / size;
        (ymin, xmin, ymax, xmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_side_rounds_up_to_multiple_of_4() {
        assert_eq!(Region::min_side(300, 300), 152);
        assert_eq!(Region::min_side(320, 240), 160);
    }

    #[test]
    fn region_side_is_multiple_of_4_and_at_least_min_side() {
        let source = BoundingBox::new(100, 100, 50, 50);
        let min_side = Region::min_side(300, 300);
        let region = Region::from_box(&source, 1920, 1080, 1.2, min_side);

        assert_eq!(region.size() % 4, 0);
        assert!(region.size() >= min_side);
    }

    #[test]
    fn region_contains_its_source_box() {
        let source = BoundingBox::new(100, 100, 200, 300);
        let min_side = Region::min_side(300, 300);
        let region = Region::from_box(&source, 1920, 1080, 1.2, min_side);

        assert!(source.is_inside(region.bbox()));
    }

    #[test]
    fn region_clips_to_frame_bounds() {
        let source = BoundingBox::new(0, 0, 10, 10);
        let min_side = Region::min_side(300, 300);
        let region = Region::from_box(&source, 1920, 1080, 1.2, min_side);

        assert!(region.x0() >= 0);
        assert!(region.y0() >= 0);
        assert!(region.x1() <= 1920);
        assert!(region.y1() <= 1080);
    }

    #[test]
    fn normalize_denormalize_roundtrip_within_tolerance() {
        let source = BoundingBox::new(400, 300, 100, 120);
        let region = Region::from_box(&source, 1920, 1080, 1.2, 160);

        let original = BoundingBox::new(420, 310, 60, 80);
        let (ymin, xmin, ymax, xmax) = region.normalize(&original);
        let restored = region.denormalize(ymin, xmin, ymax, xmax, 1920, 1080);

        assert!((restored.x() - original.x()).abs() <= 1);
        assert!((restored.y() - original.y()).abs() <= 1);
        assert!((restored.right() - original.right()).abs() <= 1);
        assert!((restored.bottom() - original.bottom()).abs() <= 1);
    }
}
