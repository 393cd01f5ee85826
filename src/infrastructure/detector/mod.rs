//! Detector Workers & Remote Clients
//!
//! spec.md §4.3/§6: the shared wire format, the in-process worker that
//! runs an `InferenceModel` on a dedicated thread, and the shared-memory
//! client side of the protocol.

pub mod models;
pub mod remote_client;
pub mod shmem_server;
pub mod wire;
pub mod worker;

pub use models::{DoodsHttpModel, RustfaceModel};
pub use remote_client::RemoteDetectorClient;
pub use shmem_server::ShmemDetectorServer;
pub use wire::WireDetection;
pub use worker::{DetectorWorker, InferenceModel};
