//! Google Cloud KMS client over the REST API.
//!
//! - `POST {endpoint}/v1/{resource}:encrypt` with `{"plaintext": <b64>}`
//! - `POST {endpoint}/v1/{resource}:decrypt` with `{"ciphertext": <b64>}`
//!
//! Credentials come from an injected [`TokenSource`]; nothing is read from
//! the environment implicitly.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use egide_auth::{AuthError, TokenSource};

use crate::{BoxError, RemoteKmsClient};

/// Default Cloud KMS endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://cloudkms.googleapis.com";

/// Errors returned by [`CloudKmsClient`].
#[derive(Debug, Error)]
pub enum CloudKmsError {
    /// Credentials could not be obtained.
    #[error("credentials: {0}")]
    Auth(#[from] AuthError),

    /// The request could not be sent or the response read.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the service.
        body: String,
    },
}

#[derive(Serialize)]
struct EncryptRequest<'a> {
    plaintext: &'a str,
}

#[derive(Deserialize)]
struct EncryptResponse {
    ciphertext: String,
}

#[derive(Serialize)]
struct DecryptRequest<'a> {
    ciphertext: &'a str,
}

#[derive(Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

/// [`RemoteKmsClient`] for Google Cloud KMS.
#[derive(Clone)]
pub struct CloudKmsClient {
    http: Client,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
}

impl CloudKmsClient {
    /// Creates a client for `endpoint` with credentials from `tokens`.
    pub fn new(endpoint: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_client(Client::new(), endpoint, tokens)
    }

    /// Creates a client reusing an existing HTTP client.
    pub fn with_client(
        http: Client,
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            http,
            endpoint,
            tokens,
        }
    }

    fn method_url(&self, resource: &str, method: &str) -> String {
        format!("{}/v1/{}:{}", self.endpoint, resource, method)
    }

    async fn post<Req, Resp>(
        &self,
        resource: &str,
        method: &str,
        body: &Req,
    ) -> Result<Resp, CloudKmsError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let token = self.tokens.token().await?;
        let url = self.method_url(resource, method);

        debug!(url = %url, "Calling Cloud KMS");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.as_str())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(CloudKmsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Resp>().await?)
    }
}

impl std::fmt::Debug for CloudKmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudKmsClient")
            .field("endpoint", &self.endpoint)
            .field("tokens", &self.tokens.name())
            .finish()
    }
}

#[async_trait]
impl RemoteKmsClient for CloudKmsClient {
    async fn encrypt(&self, resource: &str, plaintext: &str) -> Result<String, BoxError> {
        let response: EncryptResponse = self
            .post(resource, "encrypt", &EncryptRequest { plaintext })
            .await?;
        Ok(response.ciphertext)
    }

    async fn decrypt(&self, resource: &str, ciphertext: &str) -> Result<String, BoxError> {
        let response: DecryptResponse = self
            .post(resource, "decrypt", &DecryptRequest { ciphertext })
            .await?;
        Ok(response.plaintext)
    }
}
