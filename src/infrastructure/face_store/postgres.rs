//! PostgreSQL Face Store
//!
//! `FaceStore`/`FaceLabelStore` backed by `sqlx::PgPool`, grounded on the
//! teacher's `PgCameraRepository` (`sqlx::query_as` + pool-holding struct
//! + `RepoResult`/`RepositoryError` propagation via `#[from] sqlx::Error`).

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use crate::domain::entities::{FaceLabel, FaceRecord};
use crate::domain::repositories::{FaceLabelStore, FaceStore, RepoResult, RepositoryError};
use crate::domain::value_objects::FaceEmbedding;

/// Creates a connection pool, matching the teacher's `create_pool` sizing.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(600))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Runs pending migrations, matching the teacher's `run_migrations`.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(FromRow)]
struct FaceRecordRow {
    id: String,
    label_id: i64,
    capture_time: f64,
    embedding: String,
}

impl TryFrom<FaceRecordRow> for FaceRecord {
    type Error = RepositoryError;

    fn try_from(row: FaceRecordRow) -> Result<Self, Self::Error> {
        let embedding = FaceEmbedding::from_embedding_string(&row.embedding)
            .ok_or_else(|| RepositoryError::Serialization(format!("corrupt embedding for record {}", row.id)))?;
        Ok(FaceRecord::new(row.id, row.label_id, row.capture_time, embedding))
    }
}

#[derive(FromRow)]
struct FaceLabelRow {
    id: i64,
    label: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<FaceLabelRow> for FaceLabel {
    fn from(row: FaceLabelRow) -> Self {
        FaceLabel { id: row.id, label: row.label, created_at: row.created_at }
    }
}

/// `FaceStore`/`FaceLabelStore` over a shared Postgres pool.
pub struct PgFaceStore {
    pool: PgPool,
}

impl PgFaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FaceStore for PgFaceStore {
    async fn save_record(&self, record: &FaceRecord) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO face_records (id, label_id, capture_time, embedding)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET label_id = EXCLUDED.label_id
            "#,
        )
        .bind(&record.id)
        .bind(record.label_id)
        .bind(record.capture_time)
        .bind(record.embedding.to_embedding_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_label(&self, label_id: i64) -> RepoResult<Vec<FaceRecord>> {
        let rows = sqlx::query_as::<_, FaceRecordRow>(
            r#"SELECT id, label_id, capture_time, embedding FROM face_records WHERE label_id = $1 ORDER BY capture_time ASC"#,
        )
        .bind(label_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FaceRecord::try_from).collect()
    }

    async fn find_untrained(&self) -> RepoResult<Vec<FaceRecord>> {
        let rows = sqlx::query_as::<_, FaceRecordRow>(
            r#"SELECT id, label_id, capture_time, embedding FROM face_records WHERE label_id < 0 ORDER BY capture_time ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FaceRecord::try_from).collect()
    }

    async fn find_all(&self) -> RepoResult<Vec<FaceRecord>> {
        let rows = sqlx::query_as::<_, FaceRecordRow>(
            r#"SELECT id, label_id, capture_time, embedding FROM face_records ORDER BY capture_time ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FaceRecord::try_from).collect()
    }

    async fn find_nearest(&self, embedding: &FaceEmbedding, limit: i64) -> RepoResult<Vec<(FaceRecord, f32)>> {
        // No pgvector extension in this stack; nearest-neighbor search is
        // done in-process over every stored record, matching the scale
        // spec.md §4.6 describes (a handful of labels/samples per site).
        let rows = sqlx::query_as::<_, FaceRecordRow>(
            r#"SELECT id, label_id, capture_time, embedding FROM face_records WHERE label_id >= 0"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(FaceRecord, f32)> = rows
            .into_iter()
            .filter_map(|row| FaceRecord::try_from(row).ok())
            .map(|record| {
                let distance = record.embedding.distance(embedding);
                (record, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit.max(0) as usize);
        Ok(scored)
    }

    async fn delete_record(&self, id: &str) -> RepoResult<()> {
        let result = sqlx::query(r#"DELETE FROM face_records WHERE id = $1"#).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("face record {id}")));
        }
        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        let row: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM face_records"#).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    fn as_label_store(&self) -> Option<&dyn FaceLabelStore> {
        Some(self)
    }
}

#[async_trait]
impl FaceLabelStore for PgFaceStore {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<FaceLabel>> {
        let row = sqlx::query_as::<_, FaceLabelRow>(r#"SELECT id, label, created_at FROM face_labels WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FaceLabel::from))
    }

    async fn find_by_name(&self, label: &str) -> RepoResult<Option<FaceLabel>> {
        let row = sqlx::query_as::<_, FaceLabelRow>(r#"SELECT id, label, created_at FROM face_labels WHERE label = $1"#)
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FaceLabel::from))
    }

    async fn find_all(&self) -> RepoResult<Vec<FaceLabel>> {
        let rows = sqlx::query_as::<_, FaceLabelRow>(r#"SELECT id, label, created_at FROM face_labels ORDER BY label ASC"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(FaceLabel::from).collect())
    }

    async fn create(&self, label: &str) -> RepoResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO face_labels (label) VALUES ($1) ON CONFLICT (label) DO UPDATE SET label = EXCLUDED.label RETURNING id"#,
        )
        .bind(label)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query(r#"DELETE FROM face_labels WHERE id = $1"#).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("face label {id}")));
        }
        Ok(())
    }
}
