//! Google Cloud Storage blob store.
//!
//! Uses the JSON API media download:
//! `GET {endpoint}/storage/v1/b/{bucket}/o/{object}?alt=media`, with the
//! object name percent-encoded as a single path segment.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use egide_auth::TokenSource;

use crate::{BlobStore, StorageError};

/// Default Cloud Storage endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Blob store reading objects from Google Cloud Storage.
#[derive(Clone)]
pub struct GcsBlobStore {
    http: Client,
    endpoint: Url,
    tokens: Arc<dyn TokenSource>,
}

impl GcsBlobStore {
    /// Creates a store talking to `endpoint` with credentials from `tokens`.
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not an absolute base URL.
    pub fn new(endpoint: &str, tokens: Arc<dyn TokenSource>) -> Result<Self, StorageError> {
        Self::with_client(Client::new(), endpoint, tokens)
    }

    /// Creates a store reusing an existing HTTP client.
    pub fn with_client(
        http: Client,
        endpoint: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::InvalidPath(format!("invalid endpoint {endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::InvalidPath(format!(
                "endpoint cannot be a base URL: {endpoint}"
            )));
        }

        Ok(Self {
            http,
            endpoint,
            tokens,
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidPath("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", bucket, "o", path]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

impl std::fmt::Debug for GcsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsBlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("tokens", &self.tokens.name())
            .finish()
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        if bucket.is_empty() || path.is_empty() {
            return Err(StorageError::InvalidPath(
                "bucket and object path are required".into(),
            ));
        }

        let url = self.object_url(bucket, path)?;
        let token = self.tokens.token().await?;

        debug!(bucket = bucket, object = path, "Fetching object from GCS");

        let response = self
            .http
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(format!("gs://{bucket}/{path}")));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(StorageError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "gcs"
    }
}
