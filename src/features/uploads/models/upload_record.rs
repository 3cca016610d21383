use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for one accepted upload
#[derive(Debug, Clone, FromRow)]
pub struct UploadRecord {
    pub id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub content_type: String,
    pub size: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

/// Values inserted for a new upload; id and timestamp are assigned on insert
#[derive(Debug, Clone)]
pub struct NewUploadRecord {
    pub file_name: String,
    pub file_path: String,
    pub content_type: String,
    pub size: i64,
    pub ip_address: String,
    pub user_agent: String,
}
