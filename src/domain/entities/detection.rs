//! Detection & Tracking Entities
//!
//! The per-frame result types produced by the Processing Loop, per
//! spec.md §3: `Detection`, `FaceDetection`, `TrackedObject`, `FrameResult`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{BoundingBox, FaceEmbedding, Region};

/// An object detection produced by a detector worker, in absolute frame
/// coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub score: f32,
    pub bounding_box: BoundingBox,
    pub region: Region,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, bounding_box: BoundingBox, region: Region) -> Self {
        Self {
            label: label.into(),
            score,
            bounding_box,
            region,
        }
    }

    pub fn area(&self) -> i32 {
        self.bounding_box.area()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.bounding_box.aspect_ratio()
    }
}

/// A face detection: a `Detection` plus its 128-d embedding (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDetection {
    pub detection: Detection,
    pub embedding: FaceEmbedding,
}

impl FaceDetection {
    pub fn new(detection: Detection, embedding: FaceEmbedding) -> Self {
        Self { detection, embedding }
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.detection.bounding_box
    }

    pub fn area(&self) -> i32 {
        self.detection.area()
    }

    pub fn score(&self) -> f32 {
        self.detection.score
    }
}

/// An accepted face-recognition result attributed to a face attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecognitionResult {
    pub label: String,
    pub confidence: f32,
    pub face_area: i32,
}

/// A tracked object, fused and carried across frames by the `ObjectTracker`.
/// Per spec.md §3: `estimate` is the tracker-predicted box, `motionless_count`
/// tracks stationarity, `attributes` holds contained child detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: String,
    pub label: String,
    pub score: f32,
    pub bounding_box: BoundingBox,
    pub region: Region,
    /// Tracker-predicted box for the current frame.
    pub estimate: BoundingBox,
    /// Frames in which position has not meaningfully changed.
    pub motionless_count: u32,
    /// Number of consecutive frames this track has gone unmatched.
    pub disappeared: u32,
    pub frame_time: f64,
    pub sub_label: Option<String>,
    pub sub_label_score: Option<f32>,
    /// Child detections (e.g. faces) whose box is strictly inside this
    /// object's box (spec.md §3 invariant).
    pub attributes: Vec<Detection>,
}

impl TrackedObject {
    pub fn new(id: impl Into<String>, label: impl Into<String>, score: f32, bounding_box: BoundingBox, region: Region, frame_time: f64) -> Self {
        let estimate = bounding_box.clone();
        Self {
            id: id.into(),
            label: label.into(),
            score,
            bounding_box,
            region,
            estimate,
            motionless_count: 0,
            disappeared: 0,
            frame_time,
            sub_label: None,
            sub_label_score: None,
            attributes: Vec::new(),
        }
    }

    pub fn area(&self) -> i32 {
        self.bounding_box.area()
    }

    /// True if this track's motionless counter has crossed `threshold` and
    /// it is not due for a periodic re-check this frame (spec.md §4.5 step 3).
    pub fn is_stationary(&self, threshold: u32, interval: u32) -> bool {
        if self.motionless_count < threshold {
            return false;
        }
        if self.disappeared != 0 {
            return false;
        }
        interval == 0 || self.motionless_count % interval != 0
    }

    /// Attaches a face-recognition result if its face area beats the
    /// current best (spec.md §3/§4.6: only the largest-area accepted face
    /// wins the `sub_label` slot per frame).
    pub fn consider_face_recognition(&mut self, candidate: FaceRecognitionResult, best_area_so_far: &mut i32) {
        if candidate.face_area > *best_area_so_far {
            *best_area_so_far = candidate.face_area;
            self.sub_label = Some(candidate.label);
            self.sub_label_score = Some(candidate.confidence);
        }
    }

    /// Appends an attribute detection, enforcing the strict-containment
    /// invariant in spec.md §3.
    pub fn attach_attribute_if_contained(&mut self, attribute: Detection) -> bool {
        if attribute.bounding_box.is_inside(&self.bounding_box) && attribute.bounding_box != self.bounding_box {
            self.attributes.push(attribute);
            true
        } else {
            false
        }
    }
}

/// The per-frame result packet emitted onto `detected_objects_queue`
/// (spec.md §6): `(camera_name, frame_time, detections, motion_boxes, regions)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResult {
    pub camera_name: String,
    pub frame_time: f64,
    pub detections: HashMap<String, TrackedObject>,
    pub motion_boxes: Vec<BoundingBox>,
    pub regions: Vec<Region>,
}

impl FrameResult {
    pub fn new(camera_name: impl Into<String>, frame_time: f64) -> Self {
        Self {
            camera_name: camera_name.into(),
            frame_time,
            detections: HashMap::new(),
            motion_boxes: Vec::new(),
            regions: Vec::new(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.detections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Region;

    fn test_region() -> Region {
        Region::from_box(&BoundingBox::new(0, 0, 100, 100), 1920, 1080, 1.2, 160)
    }

    #[test]
    fn tracked_object_not_stationary_below_threshold() {
        let mut obj = TrackedObject::new("1", "person", 0.9, BoundingBox::new(0, 0, 10, 10), test_region(), 0.0);
        obj.motionless_count = 5;
        assert!(!obj.is_stationary(10, 0));
    }

    #[test]
    fn tracked_object_stationary_with_zero_interval_never_rechecks() {
        let mut obj = TrackedObject::new("1", "person", 0.9, BoundingBox::new(0, 0, 10, 10), test_region(), 0.0);
        obj.motionless_count = 100;
        assert!(obj.is_stationary(10, 0));
    }

    #[test]
    fn tracked_object_stationary_respects_periodic_recheck() {
        let mut obj = TrackedObject::new("1", "person", 0.9, BoundingBox::new(0, 0, 10, 10), test_region(), 0.0);
        obj.motionless_count = 20; // divisible by interval -> due for recheck
        assert!(!obj.is_stationary(10, 10));

        obj.motionless_count = 21;
        assert!(obj.is_stationary(10, 10));
    }

    #[test]
    fn disappeared_track_is_never_stationary() {
        let mut obj = TrackedObject::new("1", "person", 0.9, BoundingBox::new(0, 0, 10, 10), test_region(), 0.0);
        obj.motionless_count = 50;
        obj.disappeared = 1;
        assert!(!obj.is_stationary(10, 0));
    }

    #[test]
    fn attribute_attached_only_when_strictly_inside() {
        let mut obj = TrackedObject::new("1", "person", 0.9, BoundingBox::new(0, 0, 100, 100), test_region(), 0.0);
        let face = Detection::new("face", 0.8, BoundingBox::new(10, 10, 20, 20), test_region());
        assert!(obj.attach_attribute_if_contained(face));
        assert_eq!(obj.attributes.len(), 1);

        let outside = Detection::new("face", 0.8, BoundingBox::new(90, 90, 50, 50), test_region());
        assert!(!obj.attach_attribute_if_contained(outside));
        assert_eq!(obj.attributes.len(), 1);
    }

    #[test]
    fn sub_label_tracks_largest_area_face() {
        let mut obj = TrackedObject::new("1", "person", 0.9, BoundingBox::new(0, 0, 100, 100), test_region(), 0.0);
        let mut best_area = 0;

        obj.consider_face_recognition(
            FaceRecognitionResult { label: "alice".into(), confidence: 0.7, face_area: 400 },
            &mut best_area,
        );
        obj.consider_face_recognition(
            FaceRecognitionResult { label: "bob".into(), confidence: 0.9, face_area: 100 },
            &mut best_area,
        );

        assert_eq!(obj.sub_label.as_deref(), Some("alice"));
        assert_eq!(obj.sub_label_score, Some(0.7));
    }
}
