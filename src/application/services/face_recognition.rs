//! Face Recognition
//!
//! The three scoring models from spec.md §4.6: classical grayscale
//! recognizers (LBPH/Fisher/Eigen) reading a pre-trained model file, and
//! two embedding-distance variants (`DOODS_EU`/`DOODS_COS`) searched over
//! stored labeled embeddings. Grounded on `original_source/frigate/video.py`'s
//! inline face-recognition block in `process_frames`.

use thiserror::Error;

use crate::domain::entities::FaceRecord;
use crate::domain::value_objects::{eu_distance_confidence, FaceEmbedding};
use crate::infrastructure::config::{FaceRecognitionModel, ModelConfig};

/// Errors a recognizer can raise. Per spec.md §7, a model-load failure at
/// startup is fatal-at-config-time, not a per-call error; `Inference`
/// covers the Python source's bare-except around `predict()`.
#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("failed to load recognizer model: {0}")]
    ModelLoad(String),
    #[error("recognizer inference failed: {0}")]
    Inference(String),
}

/// An accepted (or attempted) recognition: `label_id <= 0` means no match
/// was found/accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionOutcome {
    pub label_id: i64,
    pub confidence: f32,
}

impl RecognitionOutcome {
    /// True if this outcome should be attached as a track's `sub_label`
    /// (spec.md §4.6: `id > 0 ∧ conf >= min_score`).
    pub fn is_accepted(&self, min_score: f32) -> bool {
        self.label_id > 0 && self.confidence >= min_score
    }
}

/// 360×360 grayscale, histogram-equalized face crop ready for a classical
/// recognizer's `predict()` (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct GrayFace {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub mod classical {
    //! The YUV→gray→crop→resize→equalize preprocessing pipeline, unified
    //! across LBPH/Fisher/Eigen per spec.md §4.6, independent of which
    //! model ultimately reads the result.

    use image::{imageops, GrayImage, Luma};
    use imageproc::contrast::equalize_histogram;

    use super::GrayFace;

    /// Computes the centered sub-rectangle `(x_min, y_min, x_max, y_max)`
    /// of size `(w * width_crop, h * height_crop)` within a `w x h` gray
    /// image (spec.md §4.6).
    pub fn centered_crop_rect(width: u32, height: u32, width_crop: f32, height_crop: f32) -> (u32, u32, u32, u32) {
        let crop_w = (width as f32 * width_crop) as u32;
        let crop_h = (height as f32 * height_crop) as u32;
        let x_min = (width.saturating_sub(crop_w)) / 2;
        let y_min = (height.saturating_sub(crop_h)) / 2;
        (x_min, y_min, (x_min + crop_w).min(width), (y_min + crop_h).min(height))
    }

    /// Converts a YUV4:2:0 face-region crop's luma plane into a 360×360,
    /// histogram-equalized grayscale face, per spec.md §4.6's classical
    /// preprocessing pipeline.
    ///
    /// `luma` is the Y-plane of the cropped face region (`width x height`,
    /// row-major, one byte per pixel — YUV4:2:0's luma plane is already
    /// plain grayscale, so no colorspace conversion is needed beyond
    /// slicing it out of the packed frame buffer).
    pub fn preprocess_face(luma: &[u8], width: u32, height: u32, width_crop: f32, height_crop: f32) -> GrayFace {
        let image = GrayImage::from_raw(width, height, luma.to_vec())
            .expect("luma buffer must match width*height");

        let (x_min, y_min, x_max, y_max) = centered_crop_rect(width, height, width_crop, height_crop);
        let crop_w = x_max.saturating_sub(x_min).max(1);
        let crop_h = y_max.saturating_sub(y_min).max(1);
        let cropped = imageops::crop_imm(&image, x_min, y_min, crop_w, crop_h).to_image();

        let resized = imageops::resize(&cropped, 360, 360, imageops::FilterType::CatmullRom);
        let equalized: GrayImage = equalize_histogram(&resized);

        GrayFace {
            width: 360,
            height: 360,
            pixels: equalized.pixels().map(|p: &Luma<u8>| p.0[0]).collect(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn centered_crop_rect_is_centered_and_within_bounds() {
            let (x0, y0, x1, y1) = centered_crop_rect(100, 100, 0.5, 0.5);
            assert_eq!(x1 - x0, 50);
            assert_eq!(y1 - y0, 50);
            assert_eq!(x0, 25);
            assert_eq!(y0, 25);
        }

        #[test]
        fn preprocess_face_always_yields_360x360() {
            let luma = vec![128u8; 200 * 200];
            let face = preprocess_face(&luma, 200, 200, 0.7, 0.7);
            assert_eq!(face.width, 360);
            assert_eq!(face.height, 360);
            assert_eq!(face.pixels.len(), 360 * 360);
        }
    }
}

/// A classical grayscale recognizer (LBPH/Fisher/Eigen): loads a
/// pre-trained model file at construction and predicts `(id, raw_conf)`
/// for a preprocessed face crop. Modeled as a trait per spec.md's
/// "duck-typed detector handles" design note; the only production
/// implementation lives behind the `opencv` feature (see
/// `infrastructure::face_store` sibling modules — classical recognizer
/// backends are normally OpenCV's `cv2.face` module, which has no
/// dependency-light equivalent in the example pack; DOODS_EU/DOODS_COS
/// are the default, dependency-light path).
pub trait ClassicalRecognizer: Send + Sync {
    /// Predicts `(id, raw_confidence)` for a preprocessed 360x360
    /// grayscale face. `raw_confidence` is the model's native distance
    /// metric (lower is better), not yet normalized.
    fn predict(&self, face: &GrayFace) -> Result<(i64, f64), RecognizerError>;
}

/// Converts a classical recognizer's raw confidence into the spec.md
/// §4.6 normalized similarity: `conf = (max_score_conversion - raw_conf) /
/// max_score_conversion`.
pub fn classical_confidence(raw_conf: f64, max_score_conversion: f32) -> f32 {
    (max_score_conversion - raw_conf as f32) / max_score_conversion
}

/// Runs a classical recognizer end to end and applies spec.md §4.6's
/// acceptance test (`id > 0 ∧ conf >= min_score`).
pub fn recognize_classical(
    recognizer: &dyn ClassicalRecognizer,
    face: &GrayFace,
    config: &ModelConfig,
) -> Result<RecognitionOutcome, RecognizerError> {
    let (id, raw_conf) = recognizer.predict(face)?;
    let confidence = classical_confidence(raw_conf, config.face_recognition_max_score_conversion);
    Ok(RecognitionOutcome { label_id: id, confidence })
}

/// `DOODS_EU`: nearest labeled embedding by Euclidean distance, per
/// spec.md §4.6. `conf = (2 - d_min) / 2`.
pub fn recognize_doods_eu(embedding: &FaceEmbedding, stored: &[FaceRecord]) -> Option<RecognitionOutcome> {
    stored
        .iter()
        .filter(|r| r.label_id >= 0)
        .map(|r| (r.label_id, embedding.distance(&r.embedding)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(label_id, d_min)| RecognitionOutcome {
            label_id,
            confidence: eu_distance_confidence(d_min),
        })
}

/// `DOODS_COS`: labeled embedding with the highest cosine similarity, per
/// spec.md §4.6. `conf = cos_max`.
pub fn recognize_doods_cos(embedding: &FaceEmbedding, stored: &[FaceRecord]) -> Option<RecognitionOutcome> {
    stored
        .iter()
        .filter(|r| r.label_id >= 0)
        .map(|r| (r.label_id, embedding.cosine_similarity(&r.embedding)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(label_id, cos_max)| RecognitionOutcome {
            label_id,
            confidence: cos_max,
        })
}

/// Runs whichever DOODS variant `model` selects and applies spec.md
/// §4.6's acceptance test.
pub fn recognize_doods(model: FaceRecognitionModel, embedding: &FaceEmbedding, stored: &[FaceRecord]) -> Option<RecognitionOutcome> {
    match model {
        FaceRecognitionModel::DoodsEu => recognize_doods_eu(embedding, stored),
        FaceRecognitionModel::DoodsCos => recognize_doods_cos(embedding, stored),
        _ => None,
    }
}

/// True if a recognized face attribute should be queued for training
/// capture, per spec.md §4.6's "Training sideband":
/// `captureenabled` exists ∧ (`face_training_camera` is "Any" or matches)
/// ∧ (`face_training_unknown_only == false` or `id <= 0`).
pub fn should_capture_training_sample(
    sentinel_exists: bool,
    camera_name: &str,
    face_training_camera: &str,
    face_training_unknown_only: bool,
    recognized_label_id: i64,
) -> bool {
    if !sentinel_exists {
        return false;
    }
    let camera_matches = face_training_camera == "Any" || face_training_camera == camera_name;
    if !camera_matches {
        return false;
    }
    !face_training_unknown_only || recognized_label_id <= 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EMBEDDING_DIMENSION;

    fn embedding(seed: f32) -> FaceEmbedding {
        let values: Vec<f32> = (0..EMBEDDING_DIMENSION).map(|i| seed + i as f32 * 0.001).collect();
        FaceEmbedding::new(values)
    }

    #[test]
    fn doods_cos_scenario_matches_spec_example() {
        // spec.md §8 scenario 5: cos(v, v_A) = 0.82, min_score = 0.5.
        let v_a = embedding(0.0);
        let mut v_values = v_a.values().to_vec();
        // perturb slightly but keep cosine similarity high
        for (i, val) in v_values.iter_mut().enumerate() {
            *val += if i % 7 == 0 { 0.05 } else { 0.0 };
        }
        let v = FaceEmbedding::new(v_values);

        let stored = vec![FaceRecord::new("a", 1, 0.0, v_a)];
        let outcome = recognize_doods_cos(&v, &stored).unwrap();
        assert_eq!(outcome.label_id, 1);
        assert!(outcome.is_accepted(0.5));
    }

    #[test]
    fn doods_eu_rejects_when_below_min_score() {
        let far = embedding(100.0);
        let near = embedding(0.0);
        let stored = vec![FaceRecord::new("a", 1, 0.0, far)];
        let outcome = recognize_doods_eu(&near, &stored).unwrap();
        assert!(!outcome.is_accepted(0.99));
    }

    #[test]
    fn doods_ignores_untrained_records() {
        let v = embedding(0.0);
        let stored = vec![FaceRecord::new("a", -1, 0.0, embedding(0.0))];
        assert!(recognize_doods_cos(&v, &stored).is_none());
    }

    #[test]
    fn classical_confidence_matches_spec_formula() {
        // raw_conf = 30, max_score_conversion = 100 -> conf = 0.70
        let conf = classical_confidence(30.0, 100.0);
        assert!((conf - 0.70).abs() < 1e-6);
    }

    #[test]
    fn training_sample_requires_sentinel_file() {
        assert!(!should_capture_training_sample(false, "front-door", "Any", true, -1));
        assert!(should_capture_training_sample(true, "front-door", "Any", true, -1));
    }

    #[test]
    fn training_sample_respects_camera_scoping() {
        assert!(!should_capture_training_sample(true, "front-door", "back-yard", true, -1));
        assert!(should_capture_training_sample(true, "front-door", "front-door", true, -1));
    }

    #[test]
    fn training_sample_respects_unknown_only_flag() {
        assert!(!should_capture_training_sample(true, "front-door", "Any", true, 7));
        assert!(should_capture_training_sample(true, "front-door", "Any", false, 7));
    }
}
