use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Blob store for uploaded file content
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under a freshly generated name and return the full path written
    async fn put(&self, data: Bytes) -> Result<String>;
}
