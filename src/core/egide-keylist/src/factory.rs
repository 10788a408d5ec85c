//! Key list provider selection from configuration strings.

use std::sync::Arc;

use egide_kms::{ConfigSpec, KmsError, KmsFactory, KmsProvider};
use egide_storage::BlobStore;

use crate::{EnvelopeConfig, EnvelopeKeyListProvider, KeyListError, KeyListProvider, StaticKeyListProvider};

const REMOTE_USAGE: &str = "remote://<account>:<location>:<bucket>:<path>";
const STATIC_USAGE: &str = "static://<file>";

/// Builds [`KeyListProvider`]s from spec strings.
///
/// - `remote://account:location:bucket:path` (alias `gkms`): envelope
///   provider over the remote KMS and the configured blob store
/// - `static://<file>`: JSON file of named key lists
#[derive(Clone, Default)]
pub struct KeyListProviderFactory {
    kms: KmsFactory,
    blob_store: Option<Arc<dyn BlobStore>>,
}

impl KeyListProviderFactory {
    /// Creates a factory using `kms` to build remote backends.
    pub fn new(kms: KmsFactory) -> Self {
        Self {
            kms,
            blob_store: None,
        }
    }

    /// Sets the store encrypted key lists are read from.
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Builds a provider from a spec string.
    pub fn build(&self, spec: &str) -> Result<Arc<dyn KeyListProvider>, KeyListError> {
        let spec = ConfigSpec::parse(spec).map_err(KmsError::from)?;

        match spec.provider.as_str() {
            "static" => {
                // Paths may contain ':', so the fields are rejoined.
                spec.require_fields(1, STATIC_USAGE)?;
                Ok(Arc::new(StaticKeyListProvider::from_file(
                    spec.joined_fields(),
                )?))
            }
            provider => match provider.parse::<KmsProvider>()? {
                KmsProvider::Remote => Ok(Arc::new(self.envelope(&spec)?)),
                KmsProvider::Local => Err(KmsError::UnknownProvider(provider.to_string()).into()),
            },
        }
    }

    fn envelope(&self, spec: &ConfigSpec) -> Result<EnvelopeKeyListProvider, KeyListError> {
        let fields = spec.require_fields(4, REMOTE_USAGE)?;
        let config = EnvelopeConfig {
            account: fields[0].clone(),
            location: fields[1].clone(),
            bucket: fields[2].clone(),
            bucket_path: fields[3].clone(),
        };

        let kms = self.kms.remote(&config.account, &config.location)?;
        let blob_store = self.blob_store.clone().ok_or_else(|| {
            KmsError::Configuration("envelope keylist requested but no blob store configured".into())
        })?;

        Ok(EnvelopeKeyListProvider::new(config, Arc::new(kms), blob_store))
    }
}

impl std::fmt::Debug for KeyListProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyListProviderFactory")
            .field("kms", &self.kms)
            .field("blob_store", &self.blob_store.as_ref().map(|b| b.name()))
            .finish()
    }
}
