//! Non-Maximum Suppression
//!
//! Suppresses weak, overlapping detections of the same label. Grounded on
//! video.py's use of `cv2.dnn.NMSBoxes(boxes, confidences, 0.5, 0.4)`
//! inside `process_frames`'s "merge objects" step; reimplemented directly
//! on `BoundingBox`/IoU rather than through an OpenCV dnn binding.

use crate::domain::entities::Detection;

/// Default NMS score threshold, per video.py's `cv2.dnn.NMSBoxes` call.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
/// Default NMS IoU threshold, per video.py's `cv2.dnn.NMSBoxes` call.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.4;

/// Runs greedy NMS over a set of detections sharing the same label,
/// keeping the highest-scoring box in each overlapping cluster.
pub fn suppress(detections: Vec<Detection>, score_threshold: f32, iou_threshold: f32) -> Vec<Detection> {
    let mut candidates: Vec<Detection> = detections.into_iter().filter(|d| d.score >= score_threshold).collect();
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| k.bounding_box.iou(&candidate.bounding_box) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Runs NMS independently per label group, since boxes of different
/// labels never compete for the same detection slot.
pub fn suppress_by_label(detections: Vec<Detection>, score_threshold: f32, iou_threshold: f32) -> Vec<Detection> {
    use std::collections::HashMap;

    let mut groups: HashMap<String, Vec<Detection>> = HashMap::new();
    for detection in detections {
        groups.entry(detection.label.clone()).or_default().push(detection);
    }

    let mut result = Vec::new();
    for (_, group) in groups {
        result.extend(suppress(group, score_threshold, iou_threshold));
    }
    result
}

/// Default containment fraction above which a smaller same-label box is
/// dropped as a duplicate of a larger one, per video.py's
/// `get_consolidated_object_detections`.
pub const DEFAULT_CONTAINMENT_THRESHOLD: f32 = 0.9;

/// Drops a detection that sits at least `containment_threshold` inside a
/// larger detection of the same label, per spec.md §4.5 step 9. Ported
/// from video.py's `get_consolidated_object_detections`, which exists
/// because a region boundary can split one physical object into two
/// detector hits of differing box sizes that NMS's IoU test alone won't
/// catch (the boxes can overlap heavily without a high IoU).
pub fn consolidate(detections: Vec<Detection>, containment_threshold: f32) -> Vec<Detection> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by_key(|&i| detections[i].bounding_box.area());

    let mut dropped = vec![false; detections.len()];
    for &i in &order {
        if dropped[i] {
            continue;
        }
        for &j in &order {
            if i == j || dropped[j] {
                continue;
            }
            let (candidate, larger) = (&detections[i], &detections[j]);
            if larger.label == candidate.label
                && larger.bounding_box.area() > candidate.bounding_box.area()
                && candidate.bounding_box.is_mostly_inside(&larger.bounding_box, containment_threshold)
            {
                dropped[i] = true;
                break;
            }
        }
    }

    detections
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !dropped[*i])
        .map(|(_, d)| d)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{BoundingBox, Region};

    fn region() -> Region {
        Region::from_box(&BoundingBox::new(0, 0, 100, 100), 1920, 1080, 1.2, 160)
    }

    fn det(score: f32, x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection::new("person", score, BoundingBox::new(x, y, w, h), region())
    }

    #[test]
    fn collapses_heavily_overlapping_boxes_to_the_higher_score() {
        let a = det(0.9, 10, 10, 50, 50);
        let b = det(0.6, 12, 12, 50, 50); // near-identical box, lower score
        let kept = suppress(vec![a, b], DEFAULT_SCORE_THRESHOLD, DEFAULT_IOU_THRESHOLD);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn keeps_disjoint_boxes_separately() {
        let a = det(0.9, 0, 0, 10, 10);
        let b = det(0.8, 500, 500, 10, 10);
        let kept = suppress(vec![a, b], DEFAULT_SCORE_THRESHOLD, DEFAULT_IOU_THRESHOLD);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn drops_detections_below_score_threshold() {
        let a = det(0.3, 0, 0, 10, 10);
        let kept = suppress(vec![a], DEFAULT_SCORE_THRESHOLD, DEFAULT_IOU_THRESHOLD);
        assert!(kept.is_empty());
    }

    #[test]
    fn result_never_exceeds_iou_threshold_between_kept_boxes() {
        let boxes = vec![
            det(0.95, 0, 0, 40, 40),
            det(0.85, 5, 5, 40, 40),
            det(0.75, 100, 100, 40, 40),
            det(0.65, 102, 102, 40, 40),
        ];
        let kept = suppress_by_label(boxes, DEFAULT_SCORE_THRESHOLD, DEFAULT_IOU_THRESHOLD);
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                assert!(kept[i].bounding_box.iou(&kept[j].bounding_box) <= DEFAULT_IOU_THRESHOLD);
            }
        }
    }

    #[test]
    fn drops_small_box_mostly_contained_in_larger_same_label_box() {
        let big = det(0.9, 0, 0, 100, 100);
        let small = det(0.8, 10, 10, 20, 20); // fully inside `big`
        let kept = consolidate(vec![big, small], DEFAULT_CONTAINMENT_THRESHOLD);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].bounding_box.width(), 100);
    }

    #[test]
    fn keeps_both_boxes_when_containment_is_below_threshold() {
        let big = det(0.9, 0, 0, 100, 100);
        let overlapping = det(0.8, 80, 80, 40, 40); // mostly outside `big`
        let kept = consolidate(vec![big, overlapping], DEFAULT_CONTAINMENT_THRESHOLD);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn does_not_consolidate_across_different_labels() {
        let person = det(0.9, 0, 0, 100, 100);
        let mut car = det(0.8, 10, 10, 20, 20);
        car.label = "car".to_string();
        let kept = consolidate(vec![person, car], DEFAULT_CONTAINMENT_THRESHOLD);
        assert_eq!(kept.len(), 2);
    }
}
