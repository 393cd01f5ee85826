//! In-Memory Face Store
//!
//! A `FaceStore`/`FaceLabelStore` implementation backed by an in-process
//! `Mutex`, used by tests and by the `migrate`-less dev path where no
//! Postgres instance is available. Mirrors `PgFaceStore`'s semantics
//! (ascending capture_time ordering, nearest-neighbor by distance) without
//! a database round trip.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::entities::{FaceLabel, FaceRecord};
use crate::domain::repositories::{FaceLabelStore, FaceStore, RepoResult, RepositoryError};
use crate::domain::value_objects::FaceEmbedding;

#[derive(Default)]
struct State {
    records: Vec<FaceRecord>,
    labels: Vec<FaceLabel>,
    next_label_id: i64,
}

/// In-memory `FaceStore`/`FaceLabelStore`.
pub struct InMemoryFaceStore {
    state: Mutex<State>,
}

impl Default for InMemoryFaceStore {
    fn default() -> Self {
        Self { state: Mutex::new(State { records: Vec::new(), labels: Vec::new(), next_label_id: 1 }) }
    }
}

impl InMemoryFaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FaceStore for InMemoryFaceStore {
    async fn save_record(&self, record: &FaceRecord) -> RepoResult<()> {
        let mut state = self.state.lock().expect("face store lock poisoned");
        state.records.retain(|r| r.id != record.id);
        state.records.push(record.clone());
        Ok(())
    }

    async fn find_by_label(&self, label_id: i64) -> RepoResult<Vec<FaceRecord>> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.records.iter().filter(|r| r.label_id == label_id).cloned().collect())
    }

    async fn find_untrained(&self) -> RepoResult<Vec<FaceRecord>> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.records.iter().filter(|r| r.is_untrained()).cloned().collect())
    }

    async fn find_all(&self) -> RepoResult<Vec<FaceRecord>> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.records.clone())
    }

    async fn find_nearest(&self, embedding: &FaceEmbedding, limit: i64) -> RepoResult<Vec<(FaceRecord, f32)>> {
        let state = self.state.lock().expect("face store lock poisoned");
        let mut scored: Vec<(FaceRecord, f32)> = state
            .records
            .iter()
            .filter(|r| r.label_id >= 0)
            .map(|r| (r.clone(), r.embedding.distance(embedding)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit.max(0) as usize);
        Ok(scored)
    }

    async fn delete_record(&self, id: &str) -> RepoResult<()> {
        let mut state = self.state.lock().expect("face store lock poisoned");
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(RepositoryError::NotFound(format!("face record {id}")));
        }
        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.records.len() as i64)
    }

    fn as_label_store(&self) -> Option<&dyn FaceLabelStore> {
        Some(self)
    }
}

#[async_trait]
impl FaceLabelStore for InMemoryFaceStore {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<FaceLabel>> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.labels.iter().find(|l| l.id == id).cloned())
    }

    async fn find_by_name(&self, label: &str) -> RepoResult<Option<FaceLabel>> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.labels.iter().find(|l| l.label == label).cloned())
    }

    async fn find_all(&self) -> RepoResult<Vec<FaceLabel>> {
        let state = self.state.lock().expect("face store lock poisoned");
        Ok(state.labels.clone())
    }

    async fn create(&self, label: &str) -> RepoResult<i64> {
        let mut state = self.state.lock().expect("face store lock poisoned");
        if let Some(existing) = state.labels.iter().find(|l| l.label == label) {
            return Ok(existing.id);
        }
        let id = state.next_label_id;
        state.next_label_id += 1;
        state.labels.push(FaceLabel::new(id, label));
        Ok(id)
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        let mut state = self.state.lock().expect("face store lock poisoned");
        let before = state.labels.len();
        state.labels.retain(|l| l.id != id);
        state.records.retain(|r| r.label_id != id);
        if state.labels.len() == before {
            return Err(RepositoryError::NotFound(format!("face label {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EMBEDDING_DIMENSION;

    fn embedding(value: f32) -> FaceEmbedding {
        FaceEmbedding::new(vec![value; EMBEDDING_DIMENSION])
    }

    #[tokio::test]
    async fn save_and_find_by_label_round_trips() {
        let store = InMemoryFaceStore::new();
        let record = FaceRecord::new("rec-1", 7, 100.0, embedding(0.1));
        store.save_record(&record).await.unwrap();

        let found = store.find_by_label(7).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "rec-1");
    }

    #[tokio::test]
    async fn find_untrained_excludes_labeled_records() {
        let store = InMemoryFaceStore::new();
        store.save_record(&FaceRecord::new("trained", 1, 0.0, embedding(0.1))).await.unwrap();
        store.save_record(&FaceRecord::new("untrained", -1, 0.0, embedding(0.2))).await.unwrap();

        let untrained = store.find_untrained().await.unwrap();
        assert_eq!(untrained.len(), 1);
        assert_eq!(untrained[0].id, "untrained");
    }

    #[tokio::test]
    async fn find_nearest_orders_by_ascending_distance() {
        let store = InMemoryFaceStore::new();
        store.save_record(&FaceRecord::new("far", 1, 0.0, embedding(5.0))).await.unwrap();
        store.save_record(&FaceRecord::new("near", 2, 0.0, embedding(0.1))).await.unwrap();

        let nearest = store.find_nearest(&embedding(0.0), 10).await.unwrap();
        assert_eq!(nearest[0].0.id, "near");
        assert_eq!(nearest[1].0.id, "far");
    }

    #[tokio::test]
    async fn create_label_is_idempotent_by_name() {
        let store = InMemoryFaceStore::new();
        let id1 = store.create("alice").await.unwrap();
        let id2 = store.create("alice").await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn delete_unknown_label_returns_not_found() {
        let store = InMemoryFaceStore::new();
        assert!(store.delete(999).await.is_err());
    }
}
