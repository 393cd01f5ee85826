//! Processing Loop
//!
//! The per-camera frame-processing pipeline, run synchronously on one
//! dedicated thread per camera: pull a frame, localize motion, plan
//! detector regions, run object/face detection, fuse into tracks, resolve
//! face recognition, and emit a per-frame result packet. Grounded on
//! `original_source/frigate/video.py`'s `process_frames`, the single
//! largest function in the retrieved source and the direct model for
//! every step below (spec.md §4.5).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::services::event_bus::EventBus;
use crate::application::services::face_recognition::{
    self, classical, recognize_classical, recognize_doods, ClassicalRecognizer, GrayFace, RecognitionOutcome,
};
use crate::application::services::nms;
use crate::application::services::object_filters::{self, ObjectFilterConfig};
use crate::application::services::region_planner;
use crate::domain::entities::{Detection, FaceRecognitionResult, FaceRecord, FrameResult, TrackedObject};
use crate::domain::events::{self, DomainEvent, ObjectDetectedEvent, QueueDroppedEvent, TrackStationaryEvent};
use crate::domain::repositories::FaceStore;
use crate::domain::value_objects::{BoundingBox, FaceEmbedding, Region};
use crate::infrastructure::config::{CameraConfig, DetectConfig, FaceRecognitionArea, ModelConfig};
use crate::infrastructure::detector::remote_client::RemoteDetectorClient;
use crate::infrastructure::detector::wire::WireDetection;
use crate::infrastructure::face_store::FaceWriteRequest;
use crate::infrastructure::frame_store::FrameStore;
use crate::infrastructure::motion::MotionDetector;
use crate::infrastructure::tracker::ObjectTracker;

/// One pulled frame, already resident in the Frame Store under `slab_name`.
pub struct PendingFrame {
    pub slab_name: String,
    pub frame_time: f64,
}

/// Everything the loop needs to resolve frame pixels and run inference for
/// one camera, gathered so `process_one_frame` stays a pure function of its
/// arguments rather than reaching into ambient state.
pub struct FrameProcessorContext<'a> {
    pub camera_name: &'a str,
    pub camera: &'a CameraConfig,
    pub model: &'a ModelConfig,
    pub detect: &'a DetectConfig,
    pub frame_store: &'a FrameStore,
    pub object_client: &'a RemoteDetectorClient,
    pub face_client: &'a RemoteDetectorClient,
    pub tracker: &'a mut dyn ObjectTracker,
    pub motion: &'a mut dyn MotionDetector,
    pub classical_recognizer: Option<&'a dyn ClassicalRecognizer>,
    pub face_store: &'a Arc<dyn FaceStore>,
    pub face_writer_tx: &'a crossbeam_channel::Sender<FaceWriteRequest>,
    pub events: &'a EventBus,
    pub detection_enabled: bool,
    /// `0..9` while the startup scan hasn't yet covered the frame; `None`
    /// once exhausted (spec.md §4.4 "Startup scan").
    pub startup_scan_counter: &'a mut Option<u32>,
    /// `FACES_DIR` (spec.md §6): holds the `captureenabled` sentinel and
    /// the `{face_id}.npy` crops the training sideband saves.
    pub faces_dir: &'a std::path::Path,
}

/// Runs the full Processing Loop over one pulled frame, returning the
/// `FrameResult` to emit, or `None` if the frame was dropped under
/// backpressure or there was nothing to track this frame.
///
/// `luma` is the Y-plane of the YUV4:2:0 frame at `(detect.width,
/// detect.height)`, already sliced out of the raw Frame Store slab by the
/// caller (camera runtime), since only the luma plane is ever needed here:
/// motion detection and the classical recognizer both work on grayscale,
/// and the detector tensors are read directly out of shared memory by
/// `RemoteDetectorClient` without this function touching the chroma planes.
pub fn process_one_frame(ctx: &mut FrameProcessorContext<'_>, frame_time: f64, luma: &[u8]) -> Option<FrameResult> {
    let width = ctx.detect.width;
    let height = ctx.detect.height;

    // Step 1: detection disabled short-circuits straight to the tracker.
    if !ctx.detection_enabled {
        ctx.tracker.match_and_update(frame_time, Vec::new());
        return None;
    }

    // Step 2: motion detection. PTZ-gating is omitted: per
    // `original_source/frigate/video.py`, `ptz_moving_at_frame_time()`
    // always returns false for non-PTZ/autotracking cameras, and PTZ
    // control is out of scope here, so motion simply runs whenever the
    // runtime toggle is enabled.
    let motion_boxes = ctx.motion.detect(luma, width as u32, height as u32);

    // Step 3: compute stationary track ids.
    let stationary_threshold = ctx.detect.stationary.threshold;
    let stationary_interval = ctx.detect.stationary.interval;
    let current_tracks = ctx.tracker.current_tracks().clone();

    let stationary: Vec<&TrackedObject> = current_tracks
        .values()
        .filter(|t| t.is_stationary(stationary_threshold, stationary_interval))
        .filter(|t| !motion_boxes.iter().any(|m| m.intersects(&t.bounding_box)))
        .collect();

    for track in &stationary {
        ctx.events.publish(DomainEvent::TrackStationary(TrackStationaryEvent {
            camera_name: ctx.camera_name.to_string(),
            track_id: track.id.clone(),
            motionless_count: track.motionless_count,
            timestamp: chrono::Utc::now(),
        }));
    }

    // Step 4: seed detections with synthetic copies of stationary tracks
    // so they flow through NMS/consolidation unchanged.
    let mut seeded_detections: Vec<Detection> = stationary
        .iter()
        .map(|t| Detection::new(t.label.clone(), t.score, t.bounding_box.clone(), t.region.clone()))
        .collect();

    // Step 5: build the region set from motion boxes + non-stationary
    // track estimates, plus the startup-scan region if still due.
    let non_stationary_estimates: Vec<BoundingBox> = current_tracks
        .values()
        .filter(|t| !t.is_stationary(stationary_threshold, stationary_interval))
        .map(|t| t.estimate.clone())
        .collect();

    let mut candidate_boxes = motion_boxes.clone();
    candidate_boxes.extend(non_stationary_estimates);

    let min_region = Region::min_side(ctx.model.width, ctx.model.height);
    let mut regions = region_planner::plan_regions(width, height, min_region, &candidate_boxes);

    if let Some(counter) = *ctx.startup_scan_counter {
        regions.push(region_planner::startup_scan_region(width, height, min_region, counter));
        *ctx.startup_scan_counter = if counter + 1 < 9 { Some(counter + 1) } else { None };
    }

    if !regions.is_empty() {
        ctx.events.publish(events::regions_planned(ctx.camera_name, frame_time, &regions));
    }

    // Steps 6-7: per-region object detection (and co-located face
    // detection under "Regions" mode), collected before NMS.
    let mut object_candidates: Vec<Detection> = Vec::new();
    let mut face_candidates: Vec<(Detection, FaceEmbedding)> = Vec::new();

    for region in &regions {
        let tensor = crop_and_resize_region(luma, width, height, region, ctx.model.width, ctx.model.height);
        let raw = ctx.object_client.request(&tensor);

        let mut region_had_person = false;
        for detection in decode_object_detections(&raw, ctx.model, region, width, height) {
            if detection.label == "person" {
                region_had_person = true;
            }
            object_candidates.push(detection);
        }

        if ctx.model.face_recognition_area == FaceRecognitionArea::Regions && region_had_person {
            let face_tensor = crop_and_resize_region(luma, width, height, region, ctx.model.face_detection_width, ctx.model.face_detection_height);
            let raw_faces = ctx.face_client.request(&face_tensor);
            face_candidates.extend(decode_face_detections(&raw_faces, ctx.model, region, width, height));
        }
    }

    seeded_detections.extend(object_candidates);

    // 4.5.1 object filters, applied before merge/consolidation.
    let filtered = object_filters::apply(seeded_detections, &ctx.camera.objects_to_track, &ctx.camera.object_filters);

    // Step 8: merge by label, NMS (score 0.5, IoU 0.4).
    let nms_applied = nms::suppress_by_label(filtered, nms::DEFAULT_SCORE_THRESHOLD, nms::DEFAULT_IOU_THRESHOLD);

    // Step 9: consolidation (drop >=90%-contained duplicates).
    let consolidated = nms::consolidate(nms_applied, nms::DEFAULT_CONTAINMENT_THRESHOLD);

    for detection in &consolidated {
        ctx.events.publish(DomainEvent::ObjectDetected(ObjectDetectedEvent {
            camera_name: ctx.camera_name.to_string(),
            frame_time,
            label: detection.label.clone(),
            score: detection.score,
            bounding_box: detection.bounding_box.clone(),
            timestamp: chrono::Utc::now(),
        }));
    }

    // "Tracked" face-recognition area mode: face detection runs per
    // tracked person after consolidation rather than per region.
    if ctx.model.face_recognition_area == FaceRecognitionArea::Tracked {
        for person in consolidated.iter().filter(|d| d.label == "person") {
            let face_min_side = Region::min_side(ctx.model.face_detection_width, ctx.model.face_detection_height);
            let face_region = Region::from_box(&person.bounding_box, width, height, 1.0, face_min_side.max(min_region));
            let tensor = crop_and_resize_region(luma, width, height, &face_region, ctx.model.face_detection_width, ctx.model.face_detection_height);
            let raw_faces = ctx.face_client.request(&tensor);
            face_candidates.extend(decode_face_detections(&raw_faces, ctx.model, &face_region, width, height));
        }
    }

    // Step 10: tracker update (no separate "skip" branch exists on
    // `ObjectTracker` — `match_and_update` always runs, carrying whatever
    // was assembled this frame, including a stationary-only seed list on
    // frames where no regions were planned).
    let mut tracks = ctx.tracker.match_and_update(frame_time, consolidated);

    // Step 11: attribute attachment — faces whose box sits strictly
    // inside a track's box are attached regardless of which mode produced
    // them.
    let mut face_attributes: Vec<(Detection, FaceEmbedding)> = Vec::new();
    for (detection, embedding) in face_candidates {
        let mut attached = false;
        for track in tracks.values_mut() {
            if track.label != "person" {
                continue;
            }
            if track.attach_attribute_if_contained(detection.clone()) {
                attached = true;
            }
        }
        if attached {
            face_attributes.push((detection, embedding));
        }
    }

    // Step 12: face recognition, promoting the largest-area accepted face
    // into each track's sub_label.
    let mut best_area_per_track: HashMap<String, i32> = HashMap::new();
    for (face_detection, embedding) in &face_attributes {
        let area = face_detection.area();
        if area < ctx.model.face_recognition_min_area || area > ctx.model.face_recognition_max_area {
            continue;
        }

        let Some(track) = tracks.values_mut().find(|t| {
            t.label == "person" && t.attributes.iter().any(|a| std::ptr::eq(a, face_detection) || *a == *face_detection)
        }) else {
            continue;
        };

        let outcome = resolve_face_recognition(ctx, embedding, luma, width, height, face_detection);
        let Some(outcome) = outcome else { continue };
        if !outcome.is_accepted(ctx.model.face_recognition_min_score) {
            continue;
        }

        let Ok(label_name) = resolve_label_name(ctx.face_store, outcome.label_id) else {
            continue;
        };

        let best_area = best_area_per_track.entry(track.id.clone()).or_insert(0);
        track.consider_face_recognition(
            FaceRecognitionResult { label: label_name.clone(), confidence: outcome.confidence, face_area: area },
            best_area,
        );

        ctx.events.publish(DomainEvent::FaceRecognized(crate::domain::events::FaceRecognizedEvent {
            camera_name: ctx.camera_name.to_string(),
            track_id: track.id.clone(),
            sub_label: label_name,
            confidence: outcome.confidence,
            timestamp: chrono::Utc::now(),
        }));

        maybe_capture_training_sample(ctx, embedding.clone(), frame_time, outcome.label_id, luma, width, height, &face_detection.bounding_box);
    }

    // Step 13: emit the frame result.
    let mut result = FrameResult::new(ctx.camera_name, frame_time);
    result.detections = tracks;
    result.motion_boxes = motion_boxes;
    result.regions = regions;
    Some(result)
}

/// Crops `region`'s square slice of the luma plane and resizes it to the
/// detector's fixed `target_w x target_h` input tensor (spec.md §4.3's
/// input buffer is a constant model-shaped tensor; regions themselves
/// vary in side length per spec.md §4.4's sizing rule, so the crop must
/// be resized down/up to the model's input shape before it is sent).
fn crop_and_resize_region(luma: &[u8], frame_width: i32, frame_height: i32, region: &Region, target_w: i32, target_h: i32) -> Vec<u8> {
    let raw = read_region_tensor(luma, frame_width, frame_height, region);
    let side = region.size() as u32;
    let Some(image) = image::GrayImage::from_raw(side, side, raw) else {
        return vec![0u8; (target_w * target_h) as usize];
    };
    let resized = image::imageops::resize(&image, target_w.max(1) as u32, target_h.max(1) as u32, image::imageops::FilterType::Triangle);
    resized.into_raw()
}

/// Reads `region`'s slice of the luma plane into a contiguous tensor for
/// the detector client (spec.md §4.3's input buffer). The detector always
/// sees `region.size() x region.size()` bytes, independent of the
/// surrounding frame's dimensions.
fn read_region_tensor(luma: &[u8], frame_width: i32, frame_height: i32, region: &Region) -> Vec<u8> {
    let size = region.size();
    let mut tensor = vec![0u8; (size * size) as usize];

    for row in 0..size {
        let src_y = region.y0() + row;
        if src_y < 0 || src_y >= frame_height {
            continue;
        }
        let src_row_start = (src_y * frame_width + region.x0()) as usize;
        let src_row_end = (src_y * frame_width + region.x0() + size).min(src_y * frame_width + frame_width) as usize;
        if src_row_start >= luma.len() || src_row_end <= src_row_start {
            continue;
        }
        let copy_len = (src_row_end - src_row_start).min(size as usize);
        let dst_start = (row * size) as usize;
        tensor[dst_start..dst_start + copy_len].copy_from_slice(&luma[src_row_start..src_row_start + copy_len]);
    }

    tensor
}

/// Decodes an object-detector response into frame-coordinate `Detection`s,
/// per spec.md §4.5 step 6: denormalize against the issuing region, clamp,
/// and drop boxes whose min corner exceeds the frame.
fn decode_object_detections(raw: &[WireDetection], model: &ModelConfig, region: &Region, frame_width: i32, frame_height: i32) -> Vec<Detection> {
    raw.iter()
        .filter(|d| d.confidence > 0.0)
        .filter_map(|d| {
            let Some(label) = model.labelmap.get(&d.label_id) else {
                warn!(label_id = d.label_id, "invalid label id from detector, dropping row");
                return None;
            };
            let bbox = region.denormalize(d.ymin, d.xmin, d.ymax, d.xmax, frame_width, frame_height);
            if bbox.min_corner_exceeds(frame_width - 1, frame_height - 1) {
                return None;
            }
            let clamped = bbox.clamp_to(frame_width - 1, frame_height - 1);
            Some(Detection::new(label.clone(), d.confidence, clamped, region.clone()))
        })
        .collect()
}

/// Decodes a face-detector response into `(Detection, FaceEmbedding)`
/// pairs, using the configured attribute label (spec.md §4.5 step 7).
fn decode_face_detections(raw: &[WireDetection], model: &ModelConfig, region: &Region, frame_width: i32, frame_height: i32) -> Vec<(Detection, FaceEmbedding)> {
    raw.iter()
        .filter(|d| d.confidence > 0.0 && d.embedding.len() == crate::domain::value_objects::EMBEDDING_DIMENSION)
        .filter_map(|d| {
            let bbox = region.denormalize(d.ymin, d.xmin, d.ymax, d.xmax, frame_width, frame_height);
            if bbox.min_corner_exceeds(frame_width - 1, frame_height - 1) {
                return None;
            }
            let clamped = bbox.clamp_to(frame_width - 1, frame_height - 1);
            let detection = Detection::new(model.face_label.clone(), d.confidence, clamped, region.clone());
            let embedding = FaceEmbedding::new(d.embedding.clone());
            Some((detection, embedding))
        })
        .collect()
}

/// Runs whichever face-recognition model is configured over one accepted
/// face attribute (spec.md §4.6).
fn resolve_face_recognition(
    ctx: &mut FrameProcessorContext<'_>,
    embedding: &FaceEmbedding,
    luma: &[u8],
    frame_width: i32,
    frame_height: i32,
    face_detection: &Detection,
) -> Option<RecognitionOutcome> {
    if ctx.model.face_recognition_model.is_doods() {
        // Embedding-distance search is synchronous in-process over
        // `FaceStore::find_all`; the store is backed by a handful of
        // labeled identities per site (spec.md §4.6), so a per-frame scan
        // is not a bottleneck the way it would be for the video path.
        let stored = block_on_find_all(ctx.face_store)?;
        return recognize_doods(ctx.model.face_recognition_model, embedding, &stored);
    }

    let recognizer = ctx.classical_recognizer?;
    let bbox = &face_detection.bounding_box;
    let region_luma = crop_luma(luma, frame_width, frame_height, bbox);
    let gray: GrayFace = classical::preprocess_face(
        &region_luma,
        bbox.width().max(1) as u32,
        bbox.height().max(1) as u32,
        ctx.model.face_recognition_width_crop,
        ctx.model.face_recognition_height_crop,
    );
    recognize_classical(recognizer, &gray, ctx.model).ok()
}

fn crop_luma(luma: &[u8], frame_width: i32, frame_height: i32, bbox: &BoundingBox) -> Vec<u8> {
    let width = bbox.width().max(1);
    let height = bbox.height().max(1);
    let mut out = vec![0u8; (width * height) as usize];

    for row in 0..height {
        let src_y = bbox.y() + row;
        if src_y < 0 || src_y >= frame_height {
            continue;
        }
        let src_start = (src_y * frame_width + bbox.x()).max(0) as usize;
        let src_end = (src_start + width as usize).min(luma.len());
        if src_end <= src_start {
            continue;
        }
        let copy_len = src_end - src_start;
        let dst_start = (row * width) as usize;
        out[dst_start..dst_start + copy_len].copy_from_slice(&luma[src_start..src_end]);
    }
    out
}

fn block_on_find_all(store: &Arc<dyn FaceStore>) -> Option<Vec<FaceRecord>> {
    let handle = tokio::runtime::Handle::try_current().ok()?;
    let store = store.clone();
    handle.block_on(async move { store.find_all().await.ok() })
}

/// Resolves a recognized `label_id` to its display name through the face
/// label store. A lookup miss (label deleted out from under a stale
/// embedding) discards this attribution per spec.md §7, leaving the
/// track's previous `sub_label` untouched by simply not calling
/// `consider_face_recognition`.
fn resolve_label_name(store: &Arc<dyn FaceStore>, label_id: i64) -> Result<String, ()> {
    if label_id <= 0 {
        return Ok("unknown".to_string());
    }
    let handle = tokio::runtime::Handle::try_current().map_err(|_| ())?;
    let store = store.clone();
    let label_store = crate::infrastructure::face_store::label_store_from(&store);
    handle.block_on(async move {
        match label_store {
            Some(label_store) => label_store.find_by_id(label_id).await.ok().flatten().map(|l| l.label).ok_or(()),
            None => Err(()),
        }
    })
}

/// Enqueues a training-sideband write if the capture sentinel and
/// per-camera scoping allow it, and saves the cropped face array to disk
/// under the same `face_id` (spec.md §4.6 "Training sideband": "enqueue a
/// face record ... and save the cropped face array to disk under
/// `face_id`"; §6 `FACES_DIR/{face_id}.npy`).
#[allow(clippy::too_many_arguments)]
fn maybe_capture_training_sample(
    ctx: &mut FrameProcessorContext<'_>,
    embedding: FaceEmbedding,
    frame_time: f64,
    recognized_label_id: i64,
    luma: &[u8],
    frame_width: i32,
    frame_height: i32,
    face_box: &BoundingBox,
) {
    let sentinel_exists = face_training_sentinel_exists(ctx);
    if !face_recognition::should_capture_training_sample(
        sentinel_exists,
        ctx.camera_name,
        &ctx.model.face_training_camera,
        ctx.model.face_training_unknown_only,
        recognized_label_id,
    ) {
        return;
    }

    let face_id = generate_face_id();

    let cropped = crop_luma(luma, frame_width, frame_height, face_box);
    let npy_path = ctx.faces_dir.join(format!("{face_id}.npy"));
    if let Err(err) = crate::infrastructure::npy::write_gray_u8(&npy_path, face_box.width().max(1) as u32, face_box.height().max(1) as u32, &cropped) {
        warn!(camera = ctx.camera_name, %err, "failed to save training-capture face crop");
    }

    let request = FaceWriteRequest { id: face_id, label_id: -1, capture_time: frame_time, embedding };
    if ctx.face_writer_tx.try_send(request).is_err() {
        debug!(camera = ctx.camera_name, "face_queue full, dropping training sample");
    }
}

fn face_training_sentinel_exists(ctx: &FrameProcessorContext<'_>) -> bool {
    ctx.faces_dir.join("captureenabled").exists()
}

fn generate_face_id() -> String {
    use rand::Rng;
    let now = chrono::Utc::now().timestamp();
    let suffix: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{now}-{suffix}")
}

/// Emits `result` onto the bounded `detected_objects_queue`, per spec.md
/// §4.5 step 13: on full, delete the frame's Frame Store slab and do not
/// emit (drop-newest backpressure); otherwise delete it after a
/// successful emit, since the slab's only consumer was this frame's
/// processing pass.
pub fn emit_or_drop(
    queue: &crossbeam_channel::Sender<FrameResult>,
    frame_store: &FrameStore,
    slab_name: &str,
    result: FrameResult,
    events: &EventBus,
) {
    let camera_name = result.camera_name.clone();
    match queue.try_send(result) {
        Ok(()) => frame_store.delete(slab_name),
        Err(_) => {
            frame_store.delete(slab_name);
            events.publish(DomainEvent::QueueDropped(QueueDroppedEvent {
                queue_name: "detected_objects_queue".to_string(),
                camera_name,
                timestamp: chrono::Utc::now(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Region;

    fn region() -> Region {
        Region::from_box(&BoundingBox::new(0, 0, 64, 64), 256, 256, 1.2, 160)
    }

    #[test]
    fn read_region_tensor_copies_the_right_pixels() {
        let frame_width = 16;
        let frame_height = 16;
        let luma: Vec<u8> = (0..(frame_width * frame_height) as u8).collect();
        let region = Region::from_box(&BoundingBox::new(4, 4, 4, 4), frame_width, frame_height, 1.0, 4);

        let tensor = read_region_tensor(&luma, frame_width, frame_height, &region);
        assert_eq!(tensor.len(), (region.size() * region.size()) as usize);

        let expected_first = luma[(region.y0() * frame_width + region.x0()) as usize];
        assert_eq!(tensor[0], expected_first);
    }

    #[test]
    fn crop_and_resize_region_always_produces_the_target_shape() {
        let frame_width = 64;
        let frame_height = 64;
        let luma: Vec<u8> = (0..(frame_width * frame_height)).map(|i| (i % 256) as u8).collect();
        let region = Region::from_box(&BoundingBox::new(10, 10, 30, 30), frame_width, frame_height, 1.2, 40);

        let tensor = crop_and_resize_region(&luma, frame_width, frame_height, &region, 20, 20);
        assert_eq!(tensor.len(), 20 * 20);
    }

    #[test]
    fn decode_object_detections_drops_unknown_label_ids() {
        let model = ModelConfig::default();
        let region = region();
        let raw = vec![WireDetection::object(9999, 0.9, 0.1, 0.1, 0.2, 0.2)];
        let decoded = decode_object_detections(&raw, &model, &region, 1920, 1080);
        assert!(decoded.is_empty());
    }

    #[test]
    fn decode_object_detections_resolves_known_label_ids() {
        let model = ModelConfig::default();
        let region = region();
        let raw = vec![WireDetection::object(0, 0.9, 0.1, 0.1, 0.2, 0.2)];
        let decoded = decode_object_detections(&raw, &model, &region, 1920, 1080);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].label, "person");
    }

    #[test]
    fn decode_face_detections_carries_the_embedding() {
        let model = ModelConfig::default();
        let region = region();
        let embedding: Vec<f32> = (0..crate::domain::value_objects::EMBEDDING_DIMENSION).map(|i| i as f32 * 0.01).collect();
        let raw = vec![WireDetection::face(0.9, 0.1, 0.1, 0.2, 0.2, embedding.clone())];
        let decoded = decode_face_detections(&raw, &model, &region, 1920, 1080);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0.label, "face");
        assert_eq!(decoded[0].1.values(), embedding.as_slice());
    }
}
