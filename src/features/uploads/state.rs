use std::sync::Arc;

use crate::core::config::UploadConfig;
use crate::features::uploads::services::UploadService;

/// Shared state for the form and upload handlers
#[derive(Clone)]
pub struct UploadState {
    pub service: Arc<UploadService>,
    pub config: Arc<UploadConfig>,
}

impl UploadState {
    pub fn new(service: Arc<UploadService>, config: Arc<UploadConfig>) -> Self {
        Self { service, config }
    }
}
