//! Object Tracker
//!
//! `spec.md` explicitly excludes "the tracker's internal association
//! algorithm" from scope — this module defines only the contract the
//! Processing Loop calls through (`ObjectTracker`) plus a minimal greedy
//! IoU-matching reference implementation so the pipeline is runnable and
//! testable end to end. This is not a claim about norfair/Kalman fidelity.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::entities::{Detection, TrackedObject};

/// Fuses per-frame detections into persistent identities across frames.
pub trait ObjectTracker: Send {
    /// The tracker's view of the world as of the last `match_and_update`
    /// call (spec.md §4.5 steps 3-5 read this before the new detections
    /// for the current frame are matched in).
    fn current_tracks(&self) -> &HashMap<String, TrackedObject>;

    /// Matches `detections` against existing tracks, updates their state,
    /// and returns the resulting track table (spec.md §4.5 step 10).
    fn match_and_update(&mut self, frame_time: f64, detections: Vec<Detection>) -> HashMap<String, TrackedObject>;
}

/// Greedy IoU-matching tracker: at each frame, matches new detections
/// against existing tracks of the same label by descending IoU, updates
/// matched tracks' estimate/motionless bookkeeping, ages out unmatched
/// tracks, and creates new tracks for unmatched detections.
pub struct GreedyIouTracker {
    tracks: HashMap<String, TrackedObject>,
    iou_threshold: f32,
    max_disappeared: u32,
    /// Below this center-movement distance (pixels), a matched track's
    /// `motionless_count` increments instead of resetting.
    stationary_motion_tolerance: f32,
}

impl GreedyIouTracker {
    pub fn new(iou_threshold: f32, max_disappeared: u32, stationary_motion_tolerance: f32) -> Self {
        Self {
            tracks: HashMap::new(),
            iou_threshold,
            max_disappeared,
            stationary_motion_tolerance,
        }
    }
}

impl Default for GreedyIouTracker {
    fn default() -> Self {
        Self::new(0.2, 10, 5.0)
    }
}

impl ObjectTracker for GreedyIouTracker {
    fn current_tracks(&self) -> &HashMap<String, TrackedObject> {
        &self.tracks
    }

    fn match_and_update(&mut self, frame_time: f64, detections: Vec<Detection>) -> HashMap<String, TrackedObject> {
        let mut unmatched_track_ids: Vec<String> = self.tracks.keys().cloned().collect();
        let mut remaining_detections: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();

        // Build all (track_id, detection_index, iou) candidates sharing a label, then
        // greedily accept matches by descending IoU.
        let mut candidates: Vec<(String, usize, f32)> = Vec::new();
        for track_id in &unmatched_track_ids {
            let track = &self.tracks[track_id];
            for (index, maybe_detection) in remaining_detections.iter().enumerate() {
                let Some(detection) = maybe_detection else { continue };
                if detection.label != track.label {
                    continue;
                }
                let iou = track.bounding_box.iou(&detection.bounding_box);
                if iou >= self.iou_threshold {
                    candidates.push((track_id.clone(), index, iou));
                }
            }
        }
        candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        let mut matched_tracks: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut matched_detections: std::collections::HashSet<usize> = std::collections::HashSet::new();

        for (track_id, detection_index, _) in candidates {
            if matched_tracks.contains(&track_id) || matched_detections.contains(&detection_index) {
                continue;
            }
            let Some(detection) = remaining_detections[detection_index].take() else { continue };

            let track = self.tracks.get_mut(&track_id).expect("candidate track must exist");
            let (old_cx, old_cy) = track.bounding_box.center();
            let (new_cx, new_cy) = detection.bounding_box.center();
            let moved = (((new_cx - old_cx).pow(2) + (new_cy - old_cy).pow(2)) as f32).sqrt();

            track.score = detection.score;
            track.bounding_box = detection.bounding_box.clone();
            track.estimate = detection.bounding_box;
            track.region = detection.region;
            track.frame_time = frame_time;
            track.disappeared = 0;
            track.motionless_count = if moved <= self.stationary_motion_tolerance {
                track.motionless_count + 1
            } else {
                0
            };

            matched_tracks.insert(track_id.clone());
            matched_detections.insert(detection_index);
        }

        unmatched_track_ids.retain(|id| !matched_tracks.contains(id));
        for track_id in unmatched_track_ids {
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.disappeared += 1;
            }
        }
        self.tracks.retain(|_, track| track.disappeared <= self.max_disappeared);

        for maybe_detection in remaining_detections {
            let Some(detection) = maybe_detection else { continue };
            let id = Uuid::new_v4().to_string();
            let new_track = TrackedObject::new(
                id.clone(),
                detection.label,
                detection.score,
                detection.bounding_box,
                detection.region,
                frame_time,
            );
            self.tracks.insert(id, new_track);
        }

        self.tracks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{BoundingBox, Region};

    fn region() -> Region {
        Region::from_box(&BoundingBox::new(0, 0, 100, 100), 1920, 1080, 1.2, 160)
    }

    fn det(label: &str, x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection::new(label, 0.9, BoundingBox::new(x, y, w, h), region())
    }

    #[test]
    fn new_detection_creates_a_new_track() {
        let mut tracker = GreedyIouTracker::default();
        let tracks = tracker.match_and_update(0.0, vec![det("person", 0, 0, 50, 50)]);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn matching_detection_reuses_the_same_track_id() {
        let mut tracker = GreedyIouTracker::default();
        let first = tracker.match_and_update(0.0, vec![det("person", 0, 0, 50, 50)]);
        let id = first.keys().next().unwrap().clone();

        let second = tracker.match_and_update(1.0, vec![det("person", 2, 2, 50, 50)]);
        assert_eq!(second.len(), 1);
        assert!(second.contains_key(&id));
    }

    #[test]
    fn stationary_motionless_count_increments_on_tiny_movement() {
        let mut tracker = GreedyIouTracker::default();
        tracker.match_and_update(0.0, vec![det("person", 0, 0, 50, 50)]);
        let second = tracker.match_and_update(1.0, vec![det("person", 1, 0, 50, 50)]);
        let track = second.values().next().unwrap();
        assert_eq!(track.motionless_count, 1);
    }

    #[test]
    fn large_movement_resets_motionless_count() {
        let mut tracker = GreedyIouTracker::default();
        tracker.match_and_update(0.0, vec![det("person", 0, 0, 50, 50)]);
        tracker.match_and_update(1.0, vec![det("person", 1, 0, 50, 50)]);
        let third = tracker.match_and_update(2.0, vec![det("person", 45, 0, 50, 50)]);
        let track = third.values().next().unwrap();
        assert_eq!(track.motionless_count, 0);
    }

    #[test]
    fn unmatched_track_ages_out_after_max_disappeared() {
        let mut tracker = GreedyIouTracker::new(0.2, 1, 5.0);
        tracker.match_and_update(0.0, vec![det("person", 0, 0, 50, 50)]);
        tracker.match_and_update(1.0, vec![]);
        let third = tracker.match_and_update(2.0, vec![]);
        assert!(third.is_empty());
    }

    #[test]
    fn different_labels_never_match_to_the_same_track() {
        let mut tracker = GreedyIouTracker::default();
        tracker.match_and_update(0.0, vec![det("person", 0, 0, 50, 50)]);
        let second = tracker.match_and_update(1.0, vec![det("dog", 0, 0, 50, 50)]);
        assert_eq!(second.len(), 2);
    }
}
