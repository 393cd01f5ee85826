//! Classical Face Recognizer (LBPH/Fisher/Eigen)
//!
//! The `opencv`-backed `ClassicalRecognizer` implementation spec.md §4.6
//! requires for the non-embedding recognition path, gated behind the
//! `opencv` feature (see DESIGN.md's Open Question on this dependency).
//! Grounded on `original_source/frigate/video.py`'s
//! `cv2.face.LBPHFaceRecognizer_create()` / `FisherFaceRecognizer_create()`
//! / `EigenFaceRecognizer_create()` plus `recognizer.read(path)` /
//! `recognizer.predict(face)` calls, reached through the `opencv` crate's
//! `face` module bindings rather than hand-rolled FFI.

use std::path::Path;
use std::sync::Mutex;

use opencv::core::Mat;
use opencv::face::{
    EigenFaceRecognizer, FaceRecognizerTrait, FaceRecognizerTraitConst, FisherFaceRecognizer, LBPHFaceRecognizer,
};
use opencv::prelude::*;

use crate::application::services::face_recognition::{ClassicalRecognizer, GrayFace, RecognizerError};
use crate::infrastructure::config::FaceRecognitionModel;

/// Wraps one of OpenCV's three classical face-recognition algorithms
/// behind the `ClassicalRecognizer` trait. OpenCV's `FaceRecognizer`
/// trait objects are not `Sync`; a `Mutex` gives the single
/// `&dyn ClassicalRecognizer` shared across camera processing threads a
/// safe `predict()` call, matching how the teacher guards non-`Sync`
/// OpenCV handles elsewhere in its camera pipeline.
pub struct OpenCvRecognizer {
    inner: Mutex<Box<dyn FaceRecognizerTrait>>,
}

impl OpenCvRecognizer {
    /// Loads `model_path` into the recognizer selected by
    /// `face_recognition_model` (spec.md §4.6: LBPH, Fisher, or Eigen).
    /// Fails fast at startup per spec.md §7's "Model-info mismatch" rule
    /// if the model is a DOODS variant (those don't use this path at all)
    /// or if the file can't be read.
    pub fn load(model: FaceRecognitionModel, model_path: &Path) -> Result<Self, RecognizerError> {
        let mut recognizer: Box<dyn FaceRecognizerTrait> = match model {
            FaceRecognitionModel::Lbph => Box::new(
                LBPHFaceRecognizer::create_def()
                    .map_err(|err| RecognizerError::ModelLoad(format!("creating LBPH recognizer: {err}")))?,
            ),
            FaceRecognitionModel::Fisher => Box::new(
                FisherFaceRecognizer::create_def()
                    .map_err(|err| RecognizerError::ModelLoad(format!("creating Fisher recognizer: {err}")))?,
            ),
            FaceRecognitionModel::Eigen => Box::new(
                EigenFaceRecognizer::create_def()
                    .map_err(|err| RecognizerError::ModelLoad(format!("creating Eigen recognizer: {err}")))?,
            ),
            FaceRecognitionModel::DoodsEu | FaceRecognitionModel::DoodsCos => {
                return Err(RecognizerError::ModelLoad(
                    "DOODS_EU/DOODS_COS do not use a classical recognizer model file".to_string(),
                ));
            }
        };

        recognizer
            .read(&model_path.to_string_lossy())
            .map_err(|err| RecognizerError::ModelLoad(format!("reading {model_path:?}: {err}")))?;

        Ok(Self { inner: Mutex::new(recognizer) })
    }
}

impl ClassicalRecognizer for OpenCvRecognizer {
    fn predict(&self, face: &GrayFace) -> Result<(i64, f64), RecognizerError> {
        let mat = Mat::from_slice_rows_cols(&face.pixels, face.height as usize, face.width as usize)
            .map_err(|err| RecognizerError::Inference(format!("building OpenCV Mat from face crop: {err}")))?;

        let mut label = -1i32;
        let mut confidence = 0.0f64;

        let recognizer = self.inner.lock().map_err(|_| RecognizerError::Inference("recognizer lock poisoned".to_string()))?;
        recognizer
            .predict(&mat, &mut label, &mut confidence)
            .map_err(|err| RecognizerError::Inference(format!("predict() failed: {err}")))?;

        Ok((label as i64, confidence))
    }
}

// Safety: `Mutex` makes every access to the inner recognizer
// single-threaded at the call site; the recognizer itself is never
// accessed without holding the lock, and it is never moved across
// threads except as part of moving the whole `Mutex`.
unsafe impl Send for OpenCvRecognizer {}
unsafe impl Sync for OpenCvRecognizer {}
