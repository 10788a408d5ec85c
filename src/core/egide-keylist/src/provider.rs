//! Key list providers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use egide_kms::{KeyManagementService, KmsError, OperationContext};
use egide_storage::BlobStore;

use crate::{KeyList, KeyListError};

/// Source of named key lists.
#[async_trait]
pub trait KeyListProvider: Send + Sync {
    /// Loads the key list called `name`.
    ///
    /// Every call loads afresh; nothing is cached.
    async fn get_key_list(&self, ctx: &OperationContext, name: &str)
        -> Result<KeyList, KeyListError>;

    /// Returns the name of this provider for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Provider backed by an in-memory map of name to JSON key list text.
#[derive(Clone, Default)]
pub struct StaticKeyListProvider {
    lists: HashMap<String, String>,
}

impl StaticKeyListProvider {
    /// Creates a provider from `name -> JSON array of hex keys`.
    pub fn new(lists: HashMap<String, String>) -> Self {
        Self { lists }
    }

    /// Loads a provider from a JSON object file.
    ///
    /// Values may be JSON text (`"name": "[\"ab..\"]"`) or inline arrays
    /// (`"name": ["ab.."]`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyListError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| KeyListError::Io(format!("{}: {e}", path.display())))?;

        Self::from_json(&text)
    }

    /// Parses a JSON object of key lists, as accepted by
    /// [`from_file`](Self::from_file).
    pub fn from_json(text: &str) -> Result<Self, KeyListError> {
        let object: HashMap<String, Value> =
            serde_json::from_str(text).map_err(|e| KeyListError::InvalidFormat(e.to_string()))?;

        let lists = object
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(json) => Ok((name, json)),
                array @ Value::Array(_) => Ok((name, array.to_string())),
                _ => Err(KeyListError::InvalidFormat(format!(
                    "keylist {name}: expecting a JSON array or JSON text"
                ))),
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self { lists })
    }

    /// Returns the configured names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for StaticKeyListProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeyListProvider")
            .field("lists", &self.lists.len())
            .finish()
    }
}

#[async_trait]
impl KeyListProvider for StaticKeyListProvider {
    async fn get_key_list(
        &self,
        ctx: &OperationContext,
        name: &str,
    ) -> Result<KeyList, KeyListError> {
        ctx.check().map_err(|reason| KeyListError::Interrupted {
            operation: "load",
            reason,
        })?;

        let json = self
            .lists
            .get(name)
            .ok_or_else(|| KeyListError::NotFound(name.to_string()))?;

        let keys = KeyList::from_json(json)?;
        info!(name = name, keys = keys.len(), "Loaded key list");
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Location of encrypted key lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// KMS project (or account).
    pub account: String,
    /// KMS location.
    pub location: String,
    /// Storage bucket holding the encrypted lists.
    pub bucket: String,
    /// Path prefix inside the bucket. Also the KMS key specifier used to
    /// unwrap, so for the remote KMS it reads `<keyring>/<key>`.
    pub bucket_path: String,
}

impl EnvelopeConfig {
    /// Returns the object path of the list called `name`.
    pub fn object_path(&self, name: &str) -> String {
        format!("{}/{}", self.bucket_path, name)
    }
}

/// Provider that fetches an encrypted key list blob and unwraps it with a
/// KMS.
///
/// The blob at `<bucket_path>/<name>` is decrypted with key specifier
/// `<bucket_path>`; the plaintext must be a JSON array of hex keys.
#[derive(Clone)]
pub struct EnvelopeKeyListProvider {
    config: EnvelopeConfig,
    kms: Arc<dyn KeyManagementService>,
    blobs: Arc<dyn BlobStore>,
}

impl EnvelopeKeyListProvider {
    /// Creates a provider from its location and collaborators.
    pub fn new(
        config: EnvelopeConfig,
        kms: Arc<dyn KeyManagementService>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self { config, kms, blobs }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }
}

impl std::fmt::Debug for EnvelopeKeyListProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeKeyListProvider")
            .field("config", &self.config)
            .field("kms", &self.kms.backend())
            .field("blobs", &self.blobs.name())
            .finish()
    }
}

#[async_trait]
impl KeyListProvider for EnvelopeKeyListProvider {
    async fn get_key_list(
        &self,
        ctx: &OperationContext,
        name: &str,
    ) -> Result<KeyList, KeyListError> {
        let path = self.config.object_path(name);
        debug!(bucket = %self.config.bucket, path = %path, "Fetching encrypted key list");

        let ciphertext = ctx
            .run(self.blobs.read(&self.config.bucket, &path))
            .await
            .map_err(|reason| KeyListError::Interrupted {
                operation: "fetch",
                reason,
            })?
            .map_err(|source| KeyListError::Fetch {
                path: path.clone(),
                source,
            })?;

        let key_spec = &self.config.bucket_path;
        let plaintext = self
            .kms
            .decrypt(ctx, key_spec, &ciphertext)
            .await
            .map_err(|source| match source {
                KmsError::Cancelled { .. } => KeyListError::Interrupted {
                    operation: "unwrap",
                    reason: egide_kms::Interrupted::Cancelled,
                },
                KmsError::DeadlineExceeded { .. } => KeyListError::Interrupted {
                    operation: "unwrap",
                    reason: egide_kms::Interrupted::DeadlineExceeded,
                },
                source => KeyListError::Unwrap {
                    key_spec: key_spec.clone(),
                    source,
                },
            })?;

        let parse_error = |source: KeyListError| KeyListError::Parse {
            name: name.to_string(),
            source: Box::new(source),
        };
        let json = std::str::from_utf8(&plaintext)
            .map_err(|_| parse_error(KeyListError::InvalidFormat("not utf-8".into())))?;
        let keys = KeyList::from_json(json).map_err(parse_error)?;

        info!(
            name = name,
            keys = keys.len(),
            kms = self.kms.backend(),
            "Loaded key list"
        );
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "envelope"
    }
}
