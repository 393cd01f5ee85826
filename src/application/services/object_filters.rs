//! Object Filters
//!
//! Per-label acceptance rules applied to raw detections before they reach
//! NMS/consolidation, grounded on video.py's `filtered()` (spec.md §4.5.1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Detection;

/// A bitmap mask over the frame: `true` means the pixel is masked out
/// (objects centered there are dropped). Stored row-major, `rows x cols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMask {
    rows: usize,
    cols: usize,
    masked: Vec<bool>,
}

impl ObjectMask {
    pub fn new(rows: usize, cols: usize, masked: Vec<bool>) -> Self {
        assert_eq!(masked.len(), rows * cols, "mask data does not match declared dimensions");
        Self { rows, cols, masked }
    }

    /// True if the pixel at (x, y) is masked out.
    pub fn is_masked(&self, x: i32, y: i32) -> bool {
        let row = (y.max(0) as usize).min(self.rows.saturating_sub(1));
        let col = (x.max(0) as usize).min(self.cols.saturating_sub(1));
        self.masked[row * self.cols + col]
    }
}

/// Per-label filter settings, per spec.md §4.5.1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectFilterConfig {
    pub min_area: i32,
    pub max_area: i32,
    pub min_score: f32,
    pub min_ratio: f32,
    pub max_ratio: f32,
    pub mask: Option<ObjectMask>,
}

impl ObjectFilterConfig {
    /// An unconstrained filter: max_area/max_ratio default to "no limit".
    pub fn unrestricted() -> Self {
        Self {
            min_area: 0,
            max_area: i32::MAX,
            min_score: 0.0,
            min_ratio: 0.0,
            max_ratio: f32::MAX,
            mask: None,
        }
    }
}

/// True if `detection` should be dropped. Mirrors `filtered()`'s early
/// returns in video.py: not tracked, area/score/ratio out of bounds, or
/// centroid on a masked pixel.
pub fn is_filtered(
    detection: &Detection,
    objects_to_track: &[String],
    object_filters: &HashMap<String, ObjectFilterConfig>,
) -> bool {
    if !objects_to_track.iter().any(|label| label == &detection.label) {
        return true;
    }

    let Some(settings) = object_filters.get(&detection.label) else {
        return false;
    };

    let area = detection.area();
    if settings.min_area > area {
        return true;
    }
    if settings.max_area < area {
        return true;
    }
    if settings.min_score > detection.score {
        return true;
    }

    let ratio = detection.aspect_ratio();
    if settings.min_ratio > ratio {
        return true;
    }
    if settings.max_ratio < ratio {
        return true;
    }

    if let Some(mask) = &settings.mask {
        let bbox = &detection.bounding_box;
        let y = bbox.bottom();
        let x = (bbox.x() + bbox.right()) / 2;
        if mask.is_masked(x, y) {
            return true;
        }
    }

    false
}

/// Filters a batch of detections in place, keeping only accepted ones.
pub fn apply(
    detections: Vec<Detection>,
    objects_to_track: &[String],
    object_filters: &HashMap<String, ObjectFilterConfig>,
) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| !is_filtered(d, objects_to_track, object_filters))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{BoundingBox, Region};

    fn region() -> Region {
        Region::from_box(&BoundingBox::new(0, 0, 100, 100), 1920, 1080, 1.2, 160)
    }

    fn det(label: &str, score: f32, w: i32, h: i32) -> Detection {
        Detection::new(label, score, BoundingBox::new(0, 0, w, h), region())
    }

    #[test]
    fn drops_labels_not_tracked() {
        let d = det("dog", 0.9, 50, 50);
        assert!(is_filtered(&d, &["person".to_string()], &HashMap::new()));
    }

    #[test]
    fn drops_area_below_minimum() {
        let mut filters = HashMap::new();
        filters.insert(
            "person".to_string(),
            ObjectFilterConfig { min_area: 10_000, ..ObjectFilterConfig::unrestricted() },
        );
        let d = det("person", 0.9, 10, 10);
        assert!(is_filtered(&d, &["person".to_string()], &filters));
    }

    #[test]
    fn drops_score_below_minimum() {
        let mut filters = HashMap::new();
        filters.insert(
            "person".to_string(),
            ObjectFilterConfig { min_score: 0.8, ..ObjectFilterConfig::unrestricted() },
        );
        let d = det("person", 0.5, 50, 50);
        assert!(is_filtered(&d, &["person".to_string()], &filters));
    }

    #[test]
    fn drops_ratio_outside_bounds() {
        let mut filters = HashMap::new();
        filters.insert(
            "person".to_string(),
            ObjectFilterConfig { min_ratio: 0.5, max_ratio: 1.5, ..ObjectFilterConfig::unrestricted() },
        );
        let too_wide = det("person", 0.9, 100, 10); // ratio 10.0
        assert!(is_filtered(&too_wide, &["person".to_string()], &filters));
    }

    #[test]
    fn drops_masked_centroid() {
        let mask = ObjectMask::new(2, 2, vec![true, true, true, true]);
        let mut filters = HashMap::new();
        filters.insert(
            "person".to_string(),
            ObjectFilterConfig { mask: Some(mask), ..ObjectFilterConfig::unrestricted() },
        );
        let d = det("person", 0.9, 50, 50);
        assert!(is_filtered(&d, &["person".to_string()], &filters));
    }

    #[test]
    fn accepts_detection_within_all_bounds() {
        let mut filters = HashMap::new();
        filters.insert("person".to_string(), ObjectFilterConfig::unrestricted());
        let d = det("person", 0.9, 50, 50);
        assert!(!is_filtered(&d, &["person".to_string()], &filters));
    }
}
