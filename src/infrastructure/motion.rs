//! Motion Detection
//!
//! `spec.md` §4.5 step 2 takes `motion_boxes` as an input to the
//! Processing Loop without specifying the detector's internals, and
//! `original_source` has no `frigate/motion.py` in the retrieved set. This
//! module defines the trait contract the loop depends on
//! (`MotionDetector`) plus a frame-differencing reference implementation
//! gated by the same runtime atomics spec.md §5 names
//! (`motion_enabled`, `motion_threshold`, `motion_contour_area`,
//! `improve_contrast_enabled`).

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::contrast::equalize_histogram;

use crate::domain::value_objects::BoundingBox;
use crate::infrastructure::config::runtime::RuntimeToggles;

/// Localizes motion in a decoded frame, returning one bounding box per
/// contiguous region of change.
pub trait MotionDetector: Send {
    /// `luma` is the Y-plane of a YUV4:2:0 frame (`width x height`,
    /// row-major, one byte per pixel).
    fn detect(&mut self, luma: &[u8], width: u32, height: u32) -> Vec<BoundingBox>;
}

/// Frame-differencing motion detector: absolute difference against the
/// previous frame, thresholded, then grouped into contours. Optionally
/// histogram-equalizes each frame first (`improve_contrast_enabled`) to
/// reduce false triggers from exposure/gain shifts, mirroring Frigate's
/// `cv2.equalizeHist` pre-step.
pub struct FrameDiffMotionDetector {
    previous: Option<GrayImage>,
    runtime: RuntimeToggles,
}

impl FrameDiffMotionDetector {
    pub fn new(runtime: RuntimeToggles) -> Self {
        Self { previous: None, runtime }
    }
}

impl MotionDetector for FrameDiffMotionDetector {
    fn detect(&mut self, luma: &[u8], width: u32, height: u32) -> Vec<BoundingBox> {
        if !self.runtime.motion_enabled() {
            self.previous = None;
            return Vec::new();
        }

        let Some(current) = GrayImage::from_raw(width, height, luma.to_vec()) else {
            return Vec::new();
        };
        let current = if self.runtime.improve_contrast_enabled() {
            equalize_histogram(&current)
        } else {
            current
        };

        let Some(previous) = self.previous.replace(current.clone()) else {
            return Vec::new();
        };
        if previous.dimensions() != current.dimensions() {
            return Vec::new();
        }

        let threshold = self.runtime.motion_threshold() as u8;
        let min_area = self.runtime.motion_contour_area();

        let mut diff = GrayImage::new(width, height);
        for ((p, c), d) in previous.pixels().zip(current.pixels()).zip(diff.pixels_mut()) {
            let delta = (p.0[0] as i16 - c.0[0] as i16).unsigned_abs() as u8;
            d.0[0] = if delta >= threshold { 255 } else { 0 };
        }

        find_contours::<u32>(&diff)
            .into_iter()
            .filter_map(|contour| bounding_box_of(&contour.points))
            .filter(|bbox| bbox.area() as f32 >= min_area)
            .collect()
    }
}

fn bounding_box_of(points: &[imageproc::point::Point<u32>]) -> Option<BoundingBox> {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some(BoundingBox::new(min_x as i32, min_y as i32, (max_x - min_x + 1) as i32, (max_y - min_y + 1) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_yields_no_motion_boxes() {
        let mut detector = FrameDiffMotionDetector::new(RuntimeToggles::default());
        let frame = vec![0u8; 64 * 64];
        assert!(detector.detect(&frame, 64, 64).is_empty());
    }

    #[test]
    fn a_changed_region_is_reported_on_the_second_frame() {
        let mut detector = FrameDiffMotionDetector::new(RuntimeToggles::default());
        detector.runtime.set_improve_contrast_enabled(false);

        let first = vec![0u8; 64 * 64];
        detector.detect(&first, 64, 64);

        let mut second = vec![0u8; 64 * 64];
        for y in 10..20 {
            for x in 10..20 {
                second[y * 64 + x] = 255;
            }
        }
        detector.runtime.set_motion_contour_area(1.0);
        let boxes = detector.detect(&second, 64, 64);
        assert!(!boxes.is_empty());
    }

    #[test]
    fn disabling_motion_clears_state_and_reports_nothing() {
        let mut detector = FrameDiffMotionDetector::new(RuntimeToggles::default());
        detector.runtime.set_motion_enabled(false);
        let frame = vec![128u8; 32 * 32];
        assert!(detector.detect(&frame, 32, 32).is_empty());
    }
}
