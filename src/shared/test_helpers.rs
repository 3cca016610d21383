#![cfg(test)]

use async_trait::async_trait;
use axum::{body::to_bytes, response::Response};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::uploads::models::{NewUploadRecord, UploadRecord};
use crate::features::uploads::repositories::UploadRecordRepository;
use crate::features::uploads::{UploadService, UploadState};
use crate::modules::storage::LocalFileStore;

pub const TEST_AUTH_TOKEN: &str = "secret123";

/// Repository fake that keeps inserted records in memory
#[derive(Default)]
pub struct InMemoryUploadRecordRepository {
    records: Mutex<Vec<UploadRecord>>,
}

impl InMemoryUploadRecordRepository {
    pub fn records(&self) -> Vec<UploadRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadRecordRepository for InMemoryUploadRecordRepository {
    async fn insert(&self, record: NewUploadRecord) -> Result<UploadRecord> {
        let stored = UploadRecord {
            id: Uuid::now_v7(),
            file_name: record.file_name,
            file_path: record.file_path,
            content_type: record.content_type,
            size: record.size,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            created_at: Utc::now(),
        };
        self.records.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

/// Repository fake whose inserts always fail like an unreachable database
pub struct FailingUploadRecordRepository;

#[async_trait]
impl UploadRecordRepository for FailingUploadRecordRepository {
    async fn insert(&self, _record: NewUploadRecord) -> Result<UploadRecord> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// Build handler state over a local upload dir and the given repository
pub fn test_state(
    upload_dir: PathBuf,
    form_template_path: PathBuf,
    max_upload_size: usize,
    repository: Arc<dyn UploadRecordRepository>,
) -> UploadState {
    let config = UploadConfig {
        auth_token: TEST_AUTH_TOKEN.to_string(),
        upload_dir,
        max_upload_size,
        form_template_path,
    };
    let service = UploadService::new(repository, LocalFileStore::new(&config.upload_dir));

    UploadState::new(Arc::new(service), Arc::new(config))
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Hand-assembled `multipart/form-data` body
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: format!("upload-test-{}", Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part(&format!("form-data; name=\"{}\"", name), None);
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(
        mut self,
        name: &str,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Self {
        self.open_part(
            &format!("form-data; name=\"{}\"; filename=\"{}\"", name, file_name),
            content_type,
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body
    pub fn build(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }

    fn open_part(&mut self, disposition: &str, content_type: Option<&str>) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body
            .extend_from_slice(format!("Content-Disposition: {}\r\n", disposition).as_bytes());
        if let Some(content_type) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
    }
}
