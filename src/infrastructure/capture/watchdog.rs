//! Capture Watchdog
//!
//! Supervises one camera's decoder (and any auxiliary decoders, e.g. a
//! recorder) and restarts them on the four conditions spec.md §4.2 names:
//! the capture thread has died, no frame has arrived in 20s, the observed
//! frame rate has run away past the configured rate by 10fps, or an
//! auxiliary decoder's latest segment is older than 120s. Grounded on
//! `original_source/frigate/video.py`'s `CameraWatchdog.run()`, which polls
//! exactly these four checks on a fixed interval and restarts via
//! `ffmpeg_process.terminate()` + a timed `communicate()` + `.kill()`
//! fallback — the same shape `decoder::terminate` already implements.

use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::application::services::event_bus::EventBus;
use crate::domain::events::{CameraRestartedEvent, DomainEvent};
use crate::infrastructure::config::AuxiliaryDecoderConfig;
use crate::infrastructure::frame_store::FrameStore;

use super::decoder::{self, FrameQueueEntry, TERMINATE_GRACE};

/// No-frame stall threshold, per spec.md §4.2.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(20);
/// Observed-FPS-over-configured margin that triggers a restart.
pub const FPS_OVERRUN_MARGIN: i32 = 10;
/// Auxiliary decoder segment-staleness threshold, per spec.md §4.2.
pub const AUXILIARY_STALE_TIMEOUT: Duration = Duration::from_secs(120);
/// How often the watchdog re-evaluates its supervision checks.
const WAKE_INTERVAL: Duration = Duration::from_secs(5);

/// Everything the watchdog needs to (re)spawn a camera's primary decoder.
pub struct WatchdogConfig {
    pub camera_name: String,
    pub decoder_command: Vec<String>,
    pub frame_size: usize,
    pub configured_fps: i32,
    pub auxiliary: Vec<AuxiliaryDecoderConfig>,
    pub cache_dir: PathBuf,
}

struct CaptureHandles {
    child: Child,
    capture_thread: JoinHandle<()>,
    frame_count: Arc<AtomicU64>,
    last_frame_unix_time: Arc<AtomicU64>,
}

fn spawn_capture(
    config: &WatchdogConfig,
    frame_store: &FrameStore,
    frame_queue_tx: &Sender<FrameQueueEntry>,
    stop: &Arc<AtomicBool>,
) -> std::io::Result<CaptureHandles> {
    let mut child = decoder::spawn(&config.decoder_command)?;
    let stdout = decoder::take_stdout(&mut child).expect("decoder stdout must be piped");

    let frame_count = Arc::new(AtomicU64::new(0));
    let last_frame_unix_time = Arc::new(AtomicU64::new(0));

    let thread_frame_count = frame_count.clone();
    let thread_last_frame = last_frame_unix_time.clone();
    let thread_stop = stop.clone();
    let thread_frame_store = frame_store.clone();
    let thread_queue_tx = frame_queue_tx.clone();
    let thread_slab_prefix = config.camera_name.clone();
    let thread_frame_size = config.frame_size;

    let capture_thread = thread::Builder::new()
        .name(format!("capture-{}", config.camera_name))
        .spawn(move || {
            decoder::read_loop(
                stdout,
                thread_frame_size,
                thread_frame_store,
                thread_slab_prefix,
                thread_queue_tx,
                thread_stop,
                thread_last_frame,
                thread_frame_count,
            );
        })
        .expect("failed to spawn capture thread");

    Ok(CaptureHandles { child, capture_thread, frame_count, last_frame_unix_time })
}

fn restart_capture(
    handles: CaptureHandles,
    config: &WatchdogConfig,
    frame_store: &FrameStore,
    frame_queue_tx: &Sender<FrameQueueEntry>,
    stop: &Arc<AtomicBool>,
) -> CaptureHandles {
    let CaptureHandles { mut child, capture_thread, .. } = handles;
    decoder::terminate(&mut child, TERMINATE_GRACE);
    let _ = capture_thread.join();
    spawn_capture(config, frame_store, frame_queue_tx, stop).expect("failed to restart decoder")
}

fn camera_restarted(camera_name: impl Into<String>, reason: impl Into<String>) -> DomainEvent {
    DomainEvent::CameraRestarted(CameraRestartedEvent {
        camera_name: camera_name.into(),
        reason: reason.into(),
        timestamp: chrono::Utc::now(),
    })
}

/// Blocks supervising `config`'s decoder (and auxiliary decoders) until
/// `stop` is set. Intended to run on its own dedicated thread, one per
/// camera, alongside the capture thread it in turn supervises.
pub fn run(
    config: WatchdogConfig,
    frame_store: FrameStore,
    frame_queue_tx: Sender<FrameQueueEntry>,
    stop: Arc<AtomicBool>,
    events: EventBus,
) {
    let mut handles = spawn_capture(&config, &frame_store, &frame_queue_tx, &stop)
        .expect("failed to start decoder");

    let mut auxiliary: Vec<(AuxiliaryDecoderConfig, Child)> = config
        .auxiliary
        .iter()
        .filter_map(|aux| decoder::spawn(&aux.command).ok().map(|child| (aux.clone(), child)))
        .collect();

    let mut last_count = 0u64;
    let mut last_check = Instant::now();

    while !sleep_checking_stop(&stop, WAKE_INTERVAL) {
        let elapsed = last_check.elapsed().as_secs_f64();
        let count_now = handles.frame_count.load(Ordering::Relaxed);
        let observed_fps = if elapsed > 0.0 { (count_now.saturating_sub(last_count)) as f64 / elapsed } else { 0.0 };
        last_count = count_now;
        last_check = Instant::now();

        let capture_alive = !handles.capture_thread.is_finished();
        let last_frame_time = f64::from_bits(handles.last_frame_unix_time.load(Ordering::Relaxed));
        let stalled = last_frame_time > 0.0 && unix_time_now() - last_frame_time > STALL_TIMEOUT.as_secs_f64();
        let overrun = observed_fps >= (config.configured_fps + FPS_OVERRUN_MARGIN) as f64;

        if !capture_alive {
            warn!(camera = %config.camera_name, "capture thread died, restarting decoder");
            handles = restart_capture(handles, &config, &frame_store, &frame_queue_tx, &stop);
            events.publish(camera_restarted(config.camera_name.clone(), "capture thread died"));
        } else if stalled {
            warn!(camera = %config.camera_name, "no frame received in 20s, restarting decoder");
            handles = restart_capture(handles, &config, &frame_store, &frame_queue_tx, &stop);
            events.publish(camera_restarted(config.camera_name.clone(), "no frame received within stall timeout"));
        } else if overrun {
            warn!(camera = %config.camera_name, observed_fps, configured_fps = config.configured_fps, "observed fps overran configured fps, restarting decoder");
            handles = restart_capture(handles, &config, &frame_store, &frame_queue_tx, &stop);
            events.publish(camera_restarted(config.camera_name.clone(), "observed fps exceeded configured fps margin"));
        }

        for (aux_config, aux_child) in auxiliary.iter_mut() {
            if is_segment_stale(&config.cache_dir, &aux_config.role) {
                warn!(camera = %config.camera_name, role = %aux_config.role, "auxiliary decoder segment stale, restarting");
                decoder::terminate(aux_child, TERMINATE_GRACE);
                if let Ok(child) = decoder::spawn(&aux_config.command) {
                    *aux_child = child;
                    events.publish(camera_restarted(config.camera_name.clone(), format!("auxiliary decoder '{}' segment stale", aux_config.role)));
                }
            }
        }
    }

    decoder::terminate(&mut handles.child, TERMINATE_GRACE);
    let _ = handles.capture_thread.join();
    for (_, mut child) in auxiliary {
        decoder::terminate(&mut child, TERMINATE_GRACE);
    }
    info!(camera = %config.camera_name, "watchdog stopped");
}

/// Sleeps in short increments so a `stop` request is noticed promptly
/// rather than only at the next full wake interval. Returns `true` if
/// `stop` was observed (mirroring `threading.Event.wait`'s return value).
fn sleep_checking_stop(stop: &AtomicBool, duration: Duration) -> bool {
    let step = Duration::from_millis(200);
    let mut waited = Duration::ZERO;
    while waited < duration {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        let remaining = duration - waited;
        thread::sleep(step.min(remaining));
        waited += step;
    }
    stop.load(Ordering::Relaxed)
}

/// True if `role`'s most recent segment file under `cache_dir` is older
/// than `AUXILIARY_STALE_TIMEOUT`. A role with no segment on disk yet is
/// treated as fresh, to avoid thrashing auxiliary decoders before they've
/// produced their first segment.
fn is_segment_stale(cache_dir: &Path, role: &str) -> bool {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return false;
    };

    let newest_mtime = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(role))
        .filter_map(|entry| entry.metadata().ok())
        .filter_map(|metadata| metadata.modified().ok())
        .max();

    match newest_mtime {
        Some(modified) => modified.elapsed().map(|age| age > AUXILIARY_STALE_TIMEOUT).unwrap_or(false),
        None => false,
    }
}

fn unix_time_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_segment_stale_is_false_when_no_segment_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_segment_stale(dir.path(), "record"));
    }

    #[test]
    fn is_segment_stale_is_false_for_a_fresh_segment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("record-0.mp4"), b"segment").unwrap();
        assert!(!is_segment_stale(dir.path(), "record"));
    }

    #[test]
    fn sleep_checking_stop_returns_immediately_once_stop_is_set() {
        let stop = AtomicBool::new(true);
        let started = Instant::now();
        assert!(sleep_checking_stop(&stop, Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
