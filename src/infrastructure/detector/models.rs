//! Concrete Inference Models
//!
//! Two `InferenceModel` implementations backing the object and face
//! detector worker roles (spec.md §4.3). Grounded on the teacher's
//! `infrastructure::camera::face_detector::FaceDetector` for the rustface
//! wrapper, and on `original_source/frigate/detectors/plugins/doods.py`
//! for the HTTP-backed detector (spec.md explicitly treats the object
//! detector as "a black-box inference endpoint" — DOODS is the one named
//! in source as a remote detector API).

use std::path::PathBuf;
use std::time::Duration;

use rustface::ImageData;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::value_objects::EMBEDDING_DIMENSION;

use super::wire::WireDetection;
use super::worker::InferenceModel;

/// Face detector backed by `rustface`'s pure-Rust SEETA cascade, mirroring
/// the teacher's `FaceDetector::detector_thread` setup (min face size,
/// score threshold, pyramid scale factor, slide window step).
pub struct RustfaceModel {
    detector: Box<dyn rustface::Detector>,
    tensor_side: u32,
}

impl RustfaceModel {
    pub fn load(model_path: &PathBuf, tensor_side: u32, min_face_size: u32, score_threshold: f64) -> anyhow::Result<Self> {
        let mut detector = rustface::create_detector(&model_path.to_string_lossy())
            .map_err(|err| anyhow::anyhow!("failed to load rustface model at {model_path:?}: {err}"))?;
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(score_threshold);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);
        Ok(Self { detector, tensor_side })
    }
}

impl InferenceModel for RustfaceModel {
    fn infer(&mut self, tensor: &[u8]) -> Vec<WireDetection> {
        if tensor.len() != (self.tensor_side * self.tensor_side) as usize {
            warn!(expected = self.tensor_side * self.tensor_side, got = tensor.len(), "rustface model received a mismatched tensor, skipping");
            return Vec::new();
        }

        let image = ImageData::new(tensor, self.tensor_side, self.tensor_side);
        let side = self.tensor_side as f32;

        let mut rows: Vec<WireDetection> = self
            .detector
            .detect(&image)
            .into_iter()
            .map(|face| {
                let bbox = face.bbox();
                let xmin = bbox.x() as f32 / side;
                let ymin = bbox.y() as f32 / side;
                let xmax = (bbox.x() as f32 + bbox.width() as f32) / side;
                let ymax = (bbox.y() as f32 + bbox.height() as f32) / side;
                // rustface has no embedding head; a downstream FaceNet/ArcFace
                // pass would fill this in (see the teacher's
                // `FaceDetector::extract_embedding`, which carries the same
                // placeholder-zeros disclaimer). Recognition callers treat an
                // all-zero embedding as simply never matching any stored
                // label, which is the correct degraded behavior here.
                WireDetection::face(face.score() as f32, ymin.clamp(0.0, 1.0), xmin.clamp(0.0, 1.0), ymax.clamp(0.0, 1.0), xmax.clamp(0.0, 1.0), vec![0.0; EMBEDDING_DIMENSION])
            })
            .collect();

        super::wire::sort_by_confidence_desc(&mut rows);
        rows
    }
}

/// HTTP-backed object detector, grounded on
/// `original_source/frigate/detectors/plugins/doods.py`'s `Doods.detect_raw`:
/// base64-encodes the region as a JPEG, POSTs it to a configured endpoint,
/// and decodes a `predictions` array. Spec.md §7 requires any wire/HTTP
/// error from this upstream to degrade to zero detections rather than
/// propagate.
pub struct DoodsHttpModel {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    tensor_side: u32,
}

#[derive(Deserialize)]
struct DoodsResponse {
    predictions: Option<Vec<DoodsPrediction>>,
}

#[derive(Deserialize)]
struct DoodsPrediction {
    confidence: f32,
    #[serde(default)]
    label_id: i32,
    y_min: f32,
    x_min: f32,
    y_max: f32,
    x_max: f32,
    #[serde(default)]
    embeddings: Vec<f32>,
}

#[derive(Serialize)]
struct DoodsRequest<'a> {
    api_key: &'a str,
    data: String,
}

impl DoodsHttpModel {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, api_timeout: Duration, tensor_side: u32) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(api_timeout).build()?;
        Ok(Self { client, api_url: api_url.into(), api_key: api_key.into(), tensor_side })
    }

    fn encode_jpeg(&self, tensor: &[u8]) -> Option<String> {
        let image = image::GrayImage::from_raw(self.tensor_side, self.tensor_side, tensor.to_vec())?;
        let mut bytes: Vec<u8> = Vec::new();
        image::DynamicImage::ImageLuma8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Jpeg(85))
            .ok()?;
        Some(base64::encode(bytes))
    }
}

impl InferenceModel for DoodsHttpModel {
    fn infer(&mut self, tensor: &[u8]) -> Vec<WireDetection> {
        let Some(encoded) = self.encode_jpeg(tensor) else {
            warn!("failed to jpeg-encode detector tensor, returning empty detections");
            return Vec::new();
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&DoodsRequest { api_key: &self.api_key, data: encoded })
            .send();

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                warn!(%err, "DOODS upstream request failed, returning empty detections");
                return Vec::new();
            }
        };

        let parsed: Result<DoodsResponse, _> = response.json();
        let Ok(DoodsResponse { predictions: Some(predictions) }) = parsed else {
            warn!("DOODS upstream returned an unparseable response, returning empty detections");
            return Vec::new();
        };

        let mut rows: Vec<WireDetection> = predictions
            .into_iter()
            // Mirrors doods.py's `detection["confidence"] < 0.4: break` cutoff.
            .filter(|p| p.confidence >= 0.4)
            .take(super::wire::MAX_DETECTIONS)
            .map(|p| WireDetection {
                label_id: p.label_id,
                confidence: p.confidence,
                ymin: p.y_min,
                xmin: p.x_min,
                ymax: p.y_max,
                xmax: p.x_max,
                embedding: p.embeddings,
            })
            .collect();

        super::wire::sort_by_confidence_desc(&mut rows);
        rows
    }
}
