//! Shared-Memory Detector Server
//!
//! The worker-process half of spec.md §4.3's protocol, paired with
//! `remote_client::RemoteDetectorClient`. Polls each registered client's
//! input slab for the ready flag, hands the tensor to a `DetectorWorker`
//! (reusing its EWMA-tracked, thread-isolated inference loop), and writes
//! the encoded response back into that client's output slab.
//!
//! Grounded on `original_source/frigate/face_detection.py`'s
//! `FaceDetectionProcess.run()`, which loops over its `detection_queue`
//! forever, running inference for whichever camera posted a request and
//! writing results back into that camera's own shared array.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::warn;

use crate::infrastructure::frame_store::FrameStore;

use super::wire;
use super::worker::{DetectorWorker, InferenceModel};

const READY_FLAG_LEN: usize = 1;
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Runs a `DetectorWorker` against every client id in `client_ids`, bridging
/// the shared-memory byte-flag protocol to the in-process worker thread.
pub struct ShmemDetectorServer {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ShmemDetectorServer {
    /// Spawns a model on a dedicated `DetectorWorker` thread and a polling
    /// thread that services `client_ids`' input/output slabs.
    pub fn spawn<M>(
        name: impl Into<String>,
        model: M,
        store: FrameStore,
        client_ids: Vec<String>,
        embedding_width: usize,
        input_slab_size: usize,
    ) -> Self
    where
        M: InferenceModel + Send + 'static,
    {
        let worker = DetectorWorker::spawn(name.into(), model);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let output_slab_size = READY_FLAG_LEN + wire::buffer_len(embedding_width) * std::mem::size_of::<f32>();

        let thread = thread::Builder::new()
            .name("shmem-detector-server".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    let mut serviced_any = false;

                    for client_id in &client_ids {
                        let input_name = format!("{client_id}-in");
                        let output_name = format!("{client_id}-out");

                        let Some(mut input) = store.get(&input_name, READY_FLAG_LEN + input_slab_size) else {
                            continue;
                        };

                        if input.as_slice()[0] != 1 {
                            continue;
                        }
                        serviced_any = true;

                        let tensor = {
                            let buf = input.as_mut_slice();
                            let tensor = buf[READY_FLAG_LEN..].to_vec();
                            buf[0] = 0; // acknowledge consumption
                            tensor
                        };

                        let detections = worker.request(tensor, super::remote_client::REQUEST_TIMEOUT);
                        let encoded = wire::encode(&detections, embedding_width);
                        let bytes = wire::floats_to_bytes(&encoded);

                        let output = store
                            .create(&output_name, output_slab_size)
                            .or_else(|_| store.get(&output_name, output_slab_size).ok_or(()));

                        match output {
                            Ok(mut output) => {
                                let buf = output.as_mut_slice();
                                buf[READY_FLAG_LEN..].copy_from_slice(&bytes);
                                buf[0] = 1; // signal the client
                            }
                            Err(_) => warn!(client_id = %client_id, "could not open output slab to post detector response"),
                        }
                    }

                    if !serviced_any {
                        thread::sleep(POLL_INTERVAL);
                    }
                }
            })
            .expect("failed to spawn shmem detector server thread");

        Self { stop, thread: Some(thread) }
    }

    /// Signals the polling thread to stop and waits for it to exit.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ShmemDetectorServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::detector::remote_client::RemoteDetectorClient;
    use crate::infrastructure::detector::wire::WireDetection;

    struct FixedModel {
        reply: Vec<WireDetection>,
    }

    impl InferenceModel for FixedModel {
        fn infer(&mut self, _tensor: &[u8]) -> Vec<WireDetection> {
            self.reply.clone()
        }
    }

    #[test]
    fn client_receives_the_servers_detections() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(dir.path());
        let reply = vec![WireDetection::object(3, 0.75, 0.0, 0.0, 0.2, 0.2)];

        let server = ShmemDetectorServer::spawn(
            "test-shmem-server",
            FixedModel { reply: reply.clone() },
            store.clone(),
            vec!["cam-a".to_string()],
            0,
            wire::buffer_len(0) * std::mem::size_of::<f32>(),
        );

        let client = RemoteDetectorClient::new(store, "cam-a", 0, wire::buffer_len(0) * std::mem::size_of::<f32>());
        let result = client.request(&vec![0u8; wire::buffer_len(0) * std::mem::size_of::<f32>()]);

        assert_eq!(result[0], reply[0]);
        server.shutdown();
    }
}
