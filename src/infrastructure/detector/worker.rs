//! Detector Worker
//!
//! Runs an inference model on a dedicated OS thread behind a
//! request/response channel, grounded directly on the teacher's
//! `infrastructure::camera::face_detector::FaceDetector` pattern (a
//! `crossbeam_channel` request queue feeding a `thread::Builder::spawn`
//! loop, since detector models like `rustface::Detector` are not `Send`
//! across an `.await` and shouldn't be re-entered concurrently anyway).
//!
//! One `DetectorWorker` instance backs both the object and face detector
//! roles (spec.md §4.3): only the embedding width and the `InferenceModel`
//! implementation differ between them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};

use super::wire::WireDetection;

/// A model capable of running one inference request. Implementations are
/// not required to be `Send`+`'static` themselves — only the closure that
/// owns them inside the worker thread needs to be, which `DetectorWorker::spawn`'s
/// `'static` bound on `M` already requires.
pub trait InferenceModel {
    /// Runs inference over a preprocessed input tensor, returning up to
    /// `MAX_DETECTIONS` rows already sorted by descending confidence
    /// (spec.md §4.3 step 2).
    fn infer(&mut self, tensor: &[u8]) -> Vec<WireDetection>;
}

struct DetectionRequest {
    tensor: Vec<u8>,
    response_tx: Sender<Vec<WireDetection>>,
}

/// A handle to a running detector worker thread. Cheaply cloneable;
/// cloning shares the same request queue and EWMA speed counter.
#[derive(Clone)]
pub struct DetectorWorker {
    request_tx: Sender<DetectionRequest>,
    avg_inference_speed: Arc<AtomicU32>,
}

impl DetectorWorker {
    /// Spawns `model` on a dedicated OS thread named `name`, serving
    /// requests from a bounded queue (capacity 32, matching the teacher's
    /// `FaceDetector`).
    pub fn spawn<M>(name: impl Into<String>, mut model: M) -> Self
    where
        M: InferenceModel + Send + 'static,
    {
        let (request_tx, request_rx) = bounded::<DetectionRequest>(32);
        let avg_inference_speed = Arc::new(AtomicU32::new(0f32.to_bits()));
        let avg_inference_speed_thread = avg_inference_speed.clone();

        thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    let started = Instant::now();
                    let detections = model.infer(&request.tensor);
                    let dt = started.elapsed().as_secs_f64();

                    // EWMA: new = 0.9*old + 0.1*dt, per spec.md §4.3 step 2.
                    let old = f64::from(f32::from_bits(avg_inference_speed_thread.load(Ordering::Relaxed)));
                    let new = 0.9 * old + 0.1 * dt;
                    avg_inference_speed_thread.store((new as f32).to_bits(), Ordering::Relaxed);

                    let _ = request.response_tx.send(detections);
                }
            })
            .expect("failed to spawn detector worker thread");

        Self { request_tx, avg_inference_speed }
    }

    /// The worker's EWMA inference duration in seconds.
    pub fn avg_inference_speed(&self) -> f64 {
        f64::from(f32::from_bits(self.avg_inference_speed.load(Ordering::Relaxed)))
    }

    /// Submits a tensor and blocks for a result up to `timeout`. Returns an
    /// empty result on timeout or if the worker thread has died — a soft
    /// failure per spec.md §4.3, never a panic/exception.
    pub fn request(&self, tensor: Vec<u8>, timeout: Duration) -> Vec<WireDetection> {
        let (response_tx, response_rx) = bounded(1);
        if self.request_tx.send(DetectionRequest { tensor, response_tx }).is_err() {
            return Vec::new();
        }
        response_rx.recv_timeout(timeout).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct EchoModel {
        reply: Vec<WireDetection>,
    }

    impl InferenceModel for EchoModel {
        fn infer(&mut self, _tensor: &[u8]) -> Vec<WireDetection> {
            self.reply.clone()
        }
    }

    #[test]
    fn request_returns_the_models_detections() {
        let reply = vec![WireDetection::object(1, 0.9, 0.0, 0.0, 0.1, 0.1)];
        let worker = DetectorWorker::spawn("test-worker", EchoModel { reply: reply.clone() });
        let result = worker.request(vec![0u8; 16], Duration::from_secs(1));
        assert_eq!(result, reply);
    }

    #[test]
    fn avg_inference_speed_starts_at_zero() {
        let worker = DetectorWorker::spawn("test-worker-speed", EchoModel { reply: Vec::new() });
        assert_eq!(worker.avg_inference_speed(), 0.0);
    }

    #[test]
    fn avg_inference_speed_updates_after_a_request() {
        let worker = DetectorWorker::spawn("test-worker-speed-2", EchoModel { reply: Vec::new() });
        worker.request(vec![0u8; 16], Duration::from_secs(1));
        // Give the worker thread a moment to record the EWMA update.
        thread::sleep(Duration::from_millis(50));
        assert!(worker.avg_inference_speed() >= 0.0);
    }
}
