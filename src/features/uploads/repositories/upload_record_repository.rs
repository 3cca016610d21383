use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::uploads::models::{NewUploadRecord, UploadRecord};

/// Persistence for upload metadata
#[async_trait]
pub trait UploadRecordRepository: Send + Sync {
    /// Insert one record and return it as stored
    async fn insert(&self, record: NewUploadRecord) -> Result<UploadRecord>;
}

/// Postgres-backed repository writing to `uploaded_image_metadata`
pub struct PgUploadRecordRepository {
    pool: PgPool,
}

impl PgUploadRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadRecordRepository for PgUploadRecordRepository {
    async fn insert(&self, record: NewUploadRecord) -> Result<UploadRecord> {
        sqlx::query_as::<_, UploadRecord>(
            r#"
            INSERT INTO uploaded_image_metadata (id, file_name, file_path, content_type, size, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, file_name, file_path, content_type, size, ip_address, user_agent, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&record.file_name)
        .bind(&record.file_path)
        .bind(&record.content_type)
        .bind(record.size)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert upload record: {:?}", e);
            AppError::Database(e)
        })
    }
}
