//! Remote key management backend.
//!
//! The cryptographic work happens in an external service. This backend
//! resolves `<keyring>/<key>` into a fully-qualified resource path, base64
//! encodes the payload as the service wire contract requires, and delegates
//! the call to an injected [`RemoteKmsClient`].

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::{BoxError, KeyManagementService, KmsError, OperationContext};

/// Client for an external key management service.
///
/// Payloads cross this boundary as standard base64 text.
#[async_trait]
pub trait RemoteKmsClient: Send + Sync {
    /// Encrypts base64 `plaintext` with the key at `resource`, returning
    /// base64 ciphertext.
    async fn encrypt(&self, resource: &str, plaintext: &str) -> Result<String, BoxError>;

    /// Decrypts base64 `ciphertext` with the key at `resource`, returning
    /// base64 plaintext.
    async fn decrypt(&self, resource: &str, ciphertext: &str) -> Result<String, BoxError>;
}

/// KMS backend bound to a project and location of an external service.
#[derive(Clone)]
pub struct RemoteKms {
    project: String,
    location: String,
    client: Arc<dyn RemoteKmsClient>,
}

impl RemoteKms {
    /// Backend name.
    pub const BACKEND: &'static str = "remote";

    /// Creates a backend for `project`/`location` using `client` for transport.
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        client: Arc<dyn RemoteKmsClient>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            client,
        }
    }

    /// Returns the project (or account) this backend is bound to.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the location this backend is bound to.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Resolves `<keyring>/<key>` to
    /// `projects/{project}/locations/{location}/keyRings/{keyring}/cryptoKeys/{key}`.
    pub fn resource_path(&self, key_spec: &str) -> Result<String, KmsError> {
        let mut parts = key_spec.split('/');
        let (Some(key_ring), Some(key)) = (parts.next(), parts.next()) else {
            return Err(KmsError::MalformedKeySpecifier(format!(
                "expecting <keyring>/<key>, got: {key_spec}"
            )));
        };

        Ok(format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            self.project, self.location, key_ring, key
        ))
    }

    async fn call<F>(
        &self,
        ctx: &OperationContext,
        operation: &'static str,
        request: F,
    ) -> Result<String, KmsError>
    where
        F: std::future::Future<Output = Result<String, BoxError>> + Send,
    {
        match ctx.run(request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(source)) => Err(KmsError::Transport { operation, source }),
            Err(interrupted) => {
                warn!(operation = operation, reason = %interrupted, "Remote KMS call interrupted");
                Err(KmsError::interrupted(interrupted, operation))
            }
        }
    }
}

impl std::fmt::Debug for RemoteKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKms")
            .field("project", &self.project)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyManagementService for RemoteKms {
    async fn encrypt(
        &self,
        ctx: &OperationContext,
        key_spec: &str,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KmsError> {
        let resource = self.resource_path(key_spec)?;
        debug!(resource = %resource, "Encrypting with remote key");

        let request = Zeroizing::new(BASE64.encode(plaintext));
        let response = self
            .call(ctx, "encrypt", self.client.encrypt(&resource, &request))
            .await?;

        BASE64.decode(response).map_err(|e| KmsError::Encoding {
            operation: "encrypt",
            message: e.to_string(),
        })
    }

    async fn decrypt(
        &self,
        ctx: &OperationContext,
        key_spec: &str,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, KmsError> {
        let resource = self.resource_path(key_spec)?;
        debug!(resource = %resource, "Decrypting with remote key");

        let request = BASE64.encode(ciphertext);
        let response = Zeroizing::new(
            self.call(ctx, "decrypt", self.client.decrypt(&resource, &request))
                .await?,
        );

        BASE64
            .decode(response.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| KmsError::Encoding {
                operation: "decrypt",
                message: e.to_string(),
            })
    }

    fn backend(&self) -> &'static str {
        Self::BACKEND
    }
}
