//! Filesystem blob store.
//!
//! Objects live at `{root}/{bucket}/{path}`. Bucket names and object paths
//! are confined to the root: absolute paths and `..` components are rejected.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{BlobStore, StorageError};

/// Blob store reading from a local directory tree.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_bucket(bucket: &str) -> Result<(), StorageError> {
        if bucket.is_empty() {
            return Err(StorageError::InvalidPath("bucket cannot be empty".into()));
        }
        if bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(StorageError::InvalidPath(format!(
                "invalid bucket name: {bucket}"
            )));
        }
        Ok(())
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        Self::validate_bucket(bucket)?;

        let relative = Path::new(path);
        let confined = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || !confined {
            return Err(StorageError::InvalidPath(format!(
                "object path escapes bucket: {path}"
            )));
        }

        Ok(self.root.join(bucket).join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(bucket, path)?;

        debug!(path = %file.display(), "Reading blob from filesystem");

        tokio::fs::read(&file).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(format!("{bucket}/{path}")),
            _ => StorageError::Io(format!("{}: {e}", file.display())),
        })
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
