//! Face Store
//!
//! Concrete `FaceStore`/`FaceLabelStore` implementations (spec.md §4.7) and
//! the single-writer thread that serializes writes onto `face_queue`,
//! grounded on `original_source/frigate/face.py`'s `FaceProcessor` and on
//! the teacher's `database::repositories` + `database::connection` pattern
//! for the Postgres half.

pub mod memory;
pub mod postgres;
pub mod writer;

pub use memory::InMemoryFaceStore;
pub use postgres::PgFaceStore;
pub use writer::{FaceWriteRequest, FaceWriter};

use std::sync::Arc;

use crate::domain::repositories::{FaceLabelStore, FaceStore};

/// Borrows `store`'s `FaceLabelStore` half, when its concrete backend
/// implements both (as every backend in this crate does).
pub fn label_store_from(store: &Arc<dyn FaceStore>) -> Option<&dyn FaceLabelStore> {
    store.as_label_store()
}
