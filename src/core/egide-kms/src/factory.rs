//! KMS backend selection from configuration strings.

use std::str::FromStr;
use std::sync::Arc;

use crate::{ConfigSpec, KeyManagementService, KmsError, LocalKms, RemoteKms, RemoteKmsClient};

const REMOTE_USAGE: &str = "remote://<project>:<location>";

/// Known KMS providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmsProvider {
    /// In-process AES-GCM (`local`, alias `memkms`).
    Local,
    /// External key management service (`remote`, alias `gkms`).
    Remote,
}

impl std::fmt::Display for KmsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for KmsProvider {
    type Err = KmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" | "memkms" => Ok(Self::Local),
            "remote" | "gkms" => Ok(Self::Remote),
            _ => Err(KmsError::UnknownProvider(s.to_string())),
        }
    }
}

/// Builds [`KeyManagementService`] backends from spec strings.
///
/// The remote transport is injected here rather than discovered from the
/// process environment.
#[derive(Clone, Default)]
pub struct KmsFactory {
    remote_client: Option<Arc<dyn RemoteKmsClient>>,
}

impl KmsFactory {
    /// Creates a factory that can only build local backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client used by remote backends.
    pub fn with_remote_client(mut self, client: Arc<dyn RemoteKmsClient>) -> Self {
        self.remote_client = Some(client);
        self
    }

    /// Builds a backend from a spec such as `local://` or
    /// `remote://my-project:global`.
    pub fn build(&self, spec: &str) -> Result<Arc<dyn KeyManagementService>, KmsError> {
        let spec = ConfigSpec::parse(spec)?;

        match spec.provider.parse::<KmsProvider>()? {
            KmsProvider::Local => Ok(Arc::new(LocalKms::new())),
            KmsProvider::Remote => {
                let fields = spec.require_fields(2, REMOTE_USAGE)?;
                Ok(Arc::new(self.remote(&fields[0], &fields[1])?))
            }
        }
    }

    /// Builds a remote backend bound to `project` and `location`.
    pub fn remote(&self, project: &str, location: &str) -> Result<RemoteKms, KmsError> {
        let client = self.remote_client.clone().ok_or_else(|| {
            KmsError::Configuration("remote kms requested but no client configured".into())
        })?;

        Ok(RemoteKms::new(project, location, client))
    }
}

impl std::fmt::Debug for KmsFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsFactory")
            .field("remote_client", &self.remote_client.is_some())
            .finish()
    }
}
