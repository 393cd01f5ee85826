//! Camwatch Pipeline Daemon
//!
//! Composition root: loads configuration, stands up the shared Face Store,
//! the two shared Detector Worker slabs (object + face), and one
//! `CameraRuntime` per configured camera, then waits for Ctrl-C to tear
//! everything down in reverse order. Mirrors the teacher's `main.rs`
//! (`init_tracing()`, `AppConfig::load()?`, a constructed `Server`/`AppState`
//! run until a shutdown signal) generalized from one HTTP server to N
//! camera runtimes plus two shared detector servers.

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camwatch::application::services::event_bus::EventBus;
use camwatch::application::services::face_recognition::ClassicalRecognizer;
use camwatch::domain::entities::FrameResult;
use camwatch::domain::repositories::FaceStore;
use camwatch::domain::value_objects::EMBEDDING_DIMENSION;
use camwatch::infrastructure::camera_runtime::{CameraRuntime, CameraRuntimeDeps};
use camwatch::infrastructure::config::runtime::RuntimeToggles;
use camwatch::infrastructure::config::{AppConfig, FaceDetectorBackend};
use camwatch::infrastructure::detector::models::{DoodsHttpModel, RustfaceModel};
use camwatch::infrastructure::detector::remote_client::RemoteDetectorClient;
use camwatch::infrastructure::detector::shmem_server::ShmemDetectorServer;
use camwatch::infrastructure::face_store::{postgres, FaceWriter, PgFaceStore};
use camwatch::infrastructure::frame_store::FrameStore;

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.log_level);

    std::fs::create_dir_all(config.faces_dir()).context("creating faces dir")?;
    std::fs::create_dir_all(config.cache_dir()).context("creating cache dir")?;
    std::fs::create_dir_all(config.model_cache_dir()).context("creating model cache dir")?;

    info!(cameras = config.cameras.len(), "starting camwatch pipeline");

    let pool = postgres::create_pool(&config.database_url).await.context("connecting to face store database")?;
    postgres::run_migrations(&pool).await.context("running face store migrations")?;
    let face_store: Arc<dyn FaceStore> = Arc::new(PgFaceStore::new(pool));

    let (face_writer_tx, face_writer_rx) = bounded(config.detect.face_queue_capacity);
    let face_writer_handle = FaceWriter::spawn(face_writer_rx, face_store.clone(), tokio::runtime::Handle::current());

    let events = EventBus::new();
    let runtime_toggles = RuntimeToggles::default();

    let frame_store = FrameStore::new(config.cache_dir().join("frames"));
    let detector_store = FrameStore::new(config.cache_dir().join("detector_shm"));

    let object_tensor_side = config.model.width.max(1) as u32;
    let face_tensor_side = config.model.face_detection_width.max(1) as u32;
    let object_input_slab_size = (object_tensor_side * object_tensor_side) as usize;
    let face_input_slab_size = (face_tensor_side * face_tensor_side) as usize;

    let object_client_ids: Vec<String> = config.cameras.keys().cloned().collect();
    let face_client_ids: Vec<String> = config.cameras.keys().map(|name| format!("{name}-face")).collect();

    let object_model = DoodsHttpModel::new(
        config.model.doods_object_api_url.clone(),
        config.model.doods_api_key.clone(),
        std::time::Duration::from_millis(config.model.doods_api_timeout_ms),
        object_tensor_side,
    )
    .context("constructing object detector model")?;

    let object_server = ShmemDetectorServer::spawn(
        "object-detector",
        object_model,
        detector_store.clone(),
        object_client_ids,
        0,
        object_input_slab_size,
    );

    let face_server = match config.model.face_detector_backend {
        FaceDetectorBackend::RustfaceLocal => {
            let model = RustfaceModel::load(
                &config.rustface_model_path(),
                face_tensor_side,
                config.model.rustface_min_face_size,
                config.model.rustface_score_threshold,
            )
            .context("loading rustface model")?;
            ShmemDetectorServer::spawn(
                "face-detector",
                model,
                detector_store.clone(),
                face_client_ids,
                EMBEDDING_DIMENSION,
                face_input_slab_size,
            )
        }
        FaceDetectorBackend::DoodsHttp => {
            let model = DoodsHttpModel::new(
                config.model.doods_api_url.clone(),
                config.model.doods_api_key.clone(),
                std::time::Duration::from_millis(config.model.doods_api_timeout_ms),
                face_tensor_side,
            )
            .context("constructing face detector model")?;
            ShmemDetectorServer::spawn(
                "face-detector",
                model,
                detector_store.clone(),
                face_client_ids,
                EMBEDDING_DIMENSION,
                face_input_slab_size,
            )
        }
    };

    let classical_recognizer = build_classical_recognizer(&config);

    let (detected_objects_tx, detected_objects_rx) = bounded::<FrameResult>(config.detect.detected_objects_queue_capacity);
    let drain_handle = std::thread::Builder::new()
        .name("detected-objects-drain".to_string())
        .spawn(move || {
            while let Ok(result) = detected_objects_rx.recv() {
                info!(
                    camera = %result.camera_name,
                    frame_time = result.frame_time,
                    objects = result.detections.len(),
                    "frame processed"
                );
            }
        })
        .context("spawning detected-objects drain thread")?;

    let model = Arc::new(config.model.clone());
    let detect = Arc::new(config.detect.clone());

    let mut runtimes = Vec::new();
    for (camera_name, camera) in config.cameras.clone() {
        let object_client =
            RemoteDetectorClient::new(detector_store.clone(), camera_name.clone(), 0, object_input_slab_size);
        let face_client = RemoteDetectorClient::new(
            detector_store.clone(),
            format!("{camera_name}-face"),
            EMBEDDING_DIMENSION,
            face_input_slab_size,
        );

        let deps = CameraRuntimeDeps {
            camera_name: camera_name.clone(),
            camera,
            model: model.clone(),
            detect: detect.clone(),
            frame_store: frame_store.clone(),
            object_client,
            face_client,
            face_store: face_store.clone(),
            face_writer_tx: face_writer_tx.clone(),
            events: events.clone(),
            runtime_toggles: runtime_toggles.clone(),
            detected_objects_tx: detected_objects_tx.clone(),
            classical_recognizer: classical_recognizer.clone(),
            faces_dir: config.faces_dir(),
        };

        info!(camera = %camera_name, "starting camera runtime");
        runtimes.push(CameraRuntime::spawn(deps, config.cache_dir()));
    }

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown signal received, stopping camera runtimes");

    for runtime in runtimes {
        runtime.shutdown();
    }

    drop(face_writer_tx);
    let _ = face_writer_handle.join();

    drop(detected_objects_tx);
    let _ = drain_handle.join();

    object_server.shutdown();
    face_server.shutdown();

    info!("camwatch pipeline stopped");
    Ok(())
}

/// Builds the classical (LBPH/Fisher/Eigen) recognizer when one is
/// configured and the `opencv-recognizer` feature is compiled in. DOODS
/// variants never need this path (spec.md §4.6 resolves recognition
/// through embedding distance instead of a loaded model file).
#[cfg(feature = "opencv-recognizer")]
fn build_classical_recognizer(config: &AppConfig) -> Option<Arc<dyn ClassicalRecognizer>> {
    if config.model.face_recognition_model.is_doods() {
        return None;
    }

    match camwatch::infrastructure::classical_recognizer::OpenCvRecognizer::load(
        config.model.face_recognition_model,
        &config.model.classical_recognizer_path,
    ) {
        Ok(recognizer) => Some(Arc::new(recognizer) as Arc<dyn ClassicalRecognizer>),
        Err(err) => {
            warn!(%err, "failed to load classical recognizer, face recognition will be disabled");
            None
        }
    }
}

#[cfg(not(feature = "opencv-recognizer"))]
fn build_classical_recognizer(config: &AppConfig) -> Option<Arc<dyn ClassicalRecognizer>> {
    if !config.model.face_recognition_model.is_doods() {
        warn!(
            model = ?config.model.face_recognition_model,
            "a classical face_recognition_model is configured but this binary was built without the opencv-recognizer feature"
        );
    }
    None
}
