//! Face Store Entities
//!
//! `FaceRecord` and `FaceLabel`, per spec.md §3/§4.7. `FaceRecord.label_id`
//! is negative for untrained training-sideband samples and positive for a
//! labeled identity resolvable through `FaceLabel`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::FaceEmbedding;

/// A stored face sample: a captured embedding tied to a (possibly
/// negative/untrained) label id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    pub id: String,
    pub label_id: i64,
    pub capture_time: f64,
    pub embedding: FaceEmbedding,
}

impl FaceRecord {
    pub fn new(id: impl Into<String>, label_id: i64, capture_time: f64, embedding: FaceEmbedding) -> Self {
        Self {
            id: id.into(),
            label_id,
            capture_time,
            embedding,
        }
    }

    /// Untrained samples use a negative label id.
    pub fn is_untrained(&self) -> bool {
        self.label_id < 0
    }
}

/// A labeled identity a `FaceRecord` can resolve to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLabel {
    pub id: i64,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl FaceLabel {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EMBEDDING_DIMENSION;

    fn test_embedding() -> FaceEmbedding {
        FaceEmbedding::new(vec![0.1; EMBEDDING_DIMENSION])
    }

    #[test]
    fn negative_label_id_marks_untrained_sample() {
        let record = FaceRecord::new("abc123", -1, 0.0, test_embedding());
        assert!(record.is_untrained());
    }

    #[test]
    fn positive_label_id_is_trained() {
        let record = FaceRecord::new("abc123", 7, 0.0, test_embedding());
        assert!(!record.is_untrained());
    }
}
