//! Blob store trait definition.

use async_trait::async_trait;

use crate::error::StorageError;

/// Read-only blob storage, addressed by bucket and object path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the whole object at `path` in `bucket`.
    ///
    /// A missing object is reported as [`StorageError::NotFound`].
    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn name(&self) -> &'static str;
}
