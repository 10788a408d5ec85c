//! In-memory blob store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{BlobStore, StorageError};

/// Blob store backed by a map of `(bucket, path)` to bytes.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store with one object added.
    pub fn with_object(
        mut self,
        bucket: impl Into<String>,
        path: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.objects
            .get_mut()
            .insert((bucket.into(), path.into()), data.into());
        self
    }

    /// Stores `data` at `path` in `bucket`, replacing any previous object.
    pub async fn put(&self, bucket: &str, path: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), path.to_string()), data.into());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{path}")))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
