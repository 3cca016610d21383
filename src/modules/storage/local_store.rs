//! Local filesystem storage for uploaded files
//!
//! Files land directly in the configured upload directory under their
//! (sanitized) client-supplied name. Writing a name that already exists
//! replaces the previous contents.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::error::AppError;

/// Stores uploaded bytes in a single directory on local disk
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a file with this name is written to
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Write `data` as `file_name` inside the store root, creating the root if absent.
    ///
    /// `file_name` must already be a single path component.
    pub async fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.path_for(file_name);
        tokio::fs::write(&path, data).await?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());

        Ok(path)
    }
}
