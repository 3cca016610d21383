use std::sync::Arc;
use tracing::info;

use crate::core::error::Result;
use crate::features::uploads::dtos::ImageUpload;
use crate::features::uploads::models::{NewUploadRecord, UploadRecord};
use crate::features::uploads::repositories::UploadRecordRepository;
use crate::modules::storage::LocalFileStore;

/// Service for storing validated image uploads
pub struct UploadService {
    repository: Arc<dyn UploadRecordRepository>,
    store: LocalFileStore,
}

impl UploadService {
    pub fn new(repository: Arc<dyn UploadRecordRepository>, store: LocalFileStore) -> Self {
        Self { repository, store }
    }

    /// Write the file to disk, then record its metadata.
    ///
    /// The two steps are not atomic: when the insert fails the written file
    /// stays on disk without a record.
    pub async fn store_upload(&self, upload: ImageUpload) -> Result<UploadRecord> {
        let path = self.store.save(&upload.file_name, &upload.data).await?;

        let record = self
            .repository
            .insert(NewUploadRecord {
                file_name: upload.file_name,
                file_path: path.to_string_lossy().into_owned(),
                content_type: upload.content_type,
                size: upload.data.len() as i64,
                ip_address: upload.ip_address,
                user_agent: upload.user_agent,
            })
            .await?;

        info!(
            "Upload recorded: id={}, path={}, content_type={}, size={}",
            record.id, record.file_path, record.content_type, record.size
        );

        Ok(record)
    }
}
