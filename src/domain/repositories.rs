//! Face Store Traits
//!
//! Abstractions for the face-recognition persistence boundary (spec.md
//! §4.7). Everything else the pipeline touches (frames, regions, tracks)
//! is in-memory/shared-memory only and has no repository of its own.

use async_trait::async_trait;

use crate::domain::entities::{FaceLabel, FaceRecord};
use crate::domain::value_objects::FaceEmbedding;

/// Result type for face store operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Face store error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Persistence for face samples and their trained/untrained labels.
///
/// Implementations are written to by a single background writer thread
/// (spec.md §4.7) pulling off `face_queue`; readers may be concurrent.
#[async_trait]
pub trait FaceStore: Send + Sync {
    /// Inserts a new face sample.
    async fn save_record(&self, record: &FaceRecord) -> RepoResult<()>;

    /// Finds all records for a given label id.
    async fn find_by_label(&self, label_id: i64) -> RepoResult<Vec<FaceRecord>>;

    /// Finds all untrained records (`label_id < 0`) captured since a given
    /// training-sideband cutoff.
    async fn find_untrained(&self) -> RepoResult<Vec<FaceRecord>>;

    /// Finds every stored record, for classifier (re)training.
    async fn find_all(&self) -> RepoResult<Vec<FaceRecord>>;

    /// Finds the nearest stored records to an embedding, sorted by
    /// ascending Euclidean distance, at most `limit` results.
    async fn find_nearest(&self, embedding: &FaceEmbedding, limit: i64) -> RepoResult<Vec<(FaceRecord, f32)>>;

    /// Deletes a record by id.
    async fn delete_record(&self, id: &str) -> RepoResult<()>;

    /// Counts total stored records.
    async fn count(&self) -> RepoResult<i64>;

    /// Downcasts to this store's `FaceLabelStore` half, for the backends
    /// (every shipped one) where the same concrete type implements both.
    fn as_label_store(&self) -> Option<&dyn FaceLabelStore> {
        None
    }
}

/// Persistence for named face labels (identities).
#[async_trait]
pub trait FaceLabelStore: Send + Sync {
    /// Finds a label by id.
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<FaceLabel>>;

    /// Finds a label by name.
    async fn find_by_name(&self, label: &str) -> RepoResult<Option<FaceLabel>>;

    /// Finds all labels.
    async fn find_all(&self) -> RepoResult<Vec<FaceLabel>>;

    /// Creates a label, returning its assigned id.
    async fn create(&self, label: &str) -> RepoResult<i64>;

    /// Deletes a label and its associated records.
    async fn delete(&self, id: i64) -> RepoResult<()>;
}
