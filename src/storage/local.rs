use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Local file system blob store; one file per upload, flat layout
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn put(&self, data: Bytes) -> Result<String> {
        if !fs::try_exists(&self.base_path).await? {
            fs::create_dir_all(&self.base_path).await?;
            tracing::info!("Created blob directory {:?}", self.base_path);
        }

        let full_path = self.base_path.join(Uuid::new_v4().to_string());

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Saved {} bytes to {:?}", data.len(), full_path);
        full_path
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::Internal(format!("Non UTF-8 blob path {:?}", full_path)))
    }
}
