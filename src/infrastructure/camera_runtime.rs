//! Camera Runtime
//!
//! Wires one camera's decoder, watchdog, Frame Store slabs, detector
//! clients, tracker, motion detector, and Processing Loop together into a
//! pair of supervised threads. This is the composition root `bin/pipeline.rs`
//! calls once per configured camera; none of the pieces it assembles are
//! new here — it only threads them together the way the teacher's
//! `main.rs`/`AppState` wires its own services and repositories.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use tracing::info;

use crate::application::services::event_bus::EventBus;
use crate::application::services::face_recognition::ClassicalRecognizer;
use crate::application::use_cases::process_frame::{self, FrameProcessorContext, PendingFrame};
use crate::domain::entities::FrameResult;
use crate::domain::repositories::FaceStore;
use crate::infrastructure::capture::decoder::FrameQueueEntry;
use crate::infrastructure::capture::watchdog::{self, WatchdogConfig};
use crate::infrastructure::config::runtime::RuntimeToggles;
use crate::infrastructure::config::{CameraConfig, DetectConfig, ModelConfig};
use crate::infrastructure::detector::remote_client::RemoteDetectorClient;
use crate::infrastructure::face_store::FaceWriteRequest;
use crate::infrastructure::frame_store::FrameStore;
use crate::infrastructure::motion::FrameDiffMotionDetector;
use crate::infrastructure::tracker::GreedyIouTracker;

/// Everything one camera's Processing Loop needs that isn't per-frame
/// state, gathered so `CameraRuntime::spawn` doesn't take an unreadable
/// number of positional arguments.
pub struct CameraRuntimeDeps {
    pub camera_name: String,
    pub camera: CameraConfig,
    pub model: Arc<ModelConfig>,
    pub detect: Arc<DetectConfig>,
    pub frame_store: FrameStore,
    pub object_client: RemoteDetectorClient,
    pub face_client: RemoteDetectorClient,
    pub face_store: Arc<dyn FaceStore>,
    pub face_writer_tx: Sender<FaceWriteRequest>,
    pub events: EventBus,
    pub runtime_toggles: RuntimeToggles,
    pub detected_objects_tx: Sender<FrameResult>,
    pub classical_recognizer: Option<Arc<dyn ClassicalRecognizer>>,
    pub faces_dir: std::path::PathBuf,
}

/// The `width*height*3/2`-byte YUV4:2:0 frame shape spec.md §2's glossary
/// defines for the Frame Store.
fn frame_size(width: i32, height: i32) -> usize {
    (width as usize * height as usize * 3) / 2
}

/// One camera's live decoder + watchdog + Processing Loop, running on two
/// dedicated threads until `shutdown`.
pub struct CameraRuntime {
    camera_name: String,
    stop: Arc<AtomicBool>,
    watchdog_thread: Option<JoinHandle<()>>,
    processing_thread: Option<JoinHandle<()>>,
}

impl CameraRuntime {
    /// Spawns the watchdog (which in turn owns the capture thread) and the
    /// Processing Loop thread for one camera.
    pub fn spawn(deps: CameraRuntimeDeps, cache_dir: std::path::PathBuf) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let (frame_queue_tx, frame_queue_rx) = bounded::<FrameQueueEntry>(deps.detect.frame_queue_capacity);

        let watchdog_config = WatchdogConfig {
            camera_name: deps.camera_name.clone(),
            decoder_command: deps.camera.decoder_command.clone(),
            frame_size: frame_size(deps.camera.width, deps.camera.height),
            configured_fps: deps.camera.fps,
            auxiliary: deps.camera.auxiliary_decoders.clone(),
            cache_dir,
        };

        let watchdog_stop = stop.clone();
        let watchdog_frame_store = deps.frame_store.clone();
        let watchdog_events = deps.events.clone();
        let watchdog_frame_queue_tx = frame_queue_tx.clone();
        let watchdog_thread = thread::Builder::new()
            .name(format!("watchdog-{}", deps.camera_name))
            .spawn(move || {
                watchdog::run(watchdog_config, watchdog_frame_store, watchdog_frame_queue_tx, watchdog_stop, watchdog_events);
            })
            .expect("failed to spawn watchdog thread");

        let processing_stop = stop.clone();
        let camera_name = deps.camera_name.clone();
        let processing_thread = thread::Builder::new()
            .name(format!("processing-{camera_name}"))
            .spawn(move || run_processing_loop(deps, frame_queue_rx, processing_stop))
            .expect("failed to spawn processing loop thread");

        Self { camera_name, stop, watchdog_thread: Some(watchdog_thread), processing_thread: Some(processing_thread) }
    }

    /// Requests both threads stop and waits for them to exit.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.watchdog_thread.take() {
            let _ = thread.join();
        }
        if let Some(thread) = self.processing_thread.take() {
            let _ = thread.join();
        }
        info!(camera = %self.camera_name, "camera runtime stopped");
    }
}

fn run_processing_loop(mut deps: CameraRuntimeDeps, frame_queue_rx: crossbeam_channel::Receiver<FrameQueueEntry>, stop: Arc<AtomicBool>) {
    let mut tracker = GreedyIouTracker::default();
    let mut motion = FrameDiffMotionDetector::new(deps.runtime_toggles.clone());
    let mut startup_scan_counter = Some(0u32);

    let width = deps.detect.width;
    let height = deps.detect.height;
    let luma_len = (width * height) as usize;

    while !stop.load(Ordering::Relaxed) {
        let entry = match frame_queue_rx.recv_timeout(std::time::Duration::from_millis(500)) {
            Ok(entry) => entry,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        let pending = PendingFrame { slab_name: entry.slab_name.clone(), frame_time: entry.frame_time };

        let Some(handle) = deps.frame_store.get(&pending.slab_name, frame_size(width, height)) else {
            continue;
        };
        let luma = &handle.as_slice()[..luma_len.min(handle.len())];

        let mut ctx = FrameProcessorContext {
            camera_name: &deps.camera_name,
            camera: &deps.camera,
            model: &deps.model,
            detect: &deps.detect,
            frame_store: &deps.frame_store,
            object_client: &deps.object_client,
            face_client: &deps.face_client,
            tracker: &mut tracker,
            motion: &mut motion,
            classical_recognizer: deps.classical_recognizer.as_deref(),
            face_store: &deps.face_store,
            face_writer_tx: &deps.face_writer_tx,
            events: &deps.events,
            detection_enabled: deps.runtime_toggles.detection_enabled(),
            startup_scan_counter: &mut startup_scan_counter,
            faces_dir: &deps.faces_dir,
        };

        if let Some(result) = process_frame::process_one_frame(&mut ctx, pending.frame_time, luma) {
            process_frame::emit_or_drop(&deps.detected_objects_tx, &deps.frame_store, &pending.slab_name, result, &deps.events);
        } else {
            deps.frame_store.delete(&pending.slab_name);
        }
    }
}
