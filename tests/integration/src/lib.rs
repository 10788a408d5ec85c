//! Integration tests for Egide key lists.
//!
//! These tests run the envelope flow over real HTTP against an in-process
//! mock of Cloud KMS and Cloud Storage.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use egide_auth::StaticToken;
use egide_crypto::{aead, random};
use egide_kms::gcp::CloudKmsClient;
use egide_storage::GcsBlobStore;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CryptoRequest {
    plaintext: Option<String>,
    ciphertext: Option<String>,
}

#[derive(Debug, Serialize)]
struct EncryptResponse {
    name: String,
    ciphertext: String,
}

#[derive(Debug, Serialize)]
struct DecryptResponse {
    plaintext: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Mock Cloud
// ============================================================================

#[derive(Default)]
struct MockState {
    token: String,
    keys: Mutex<HashMap<String, [u8; 32]>>,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    hang_kms: AtomicBool,
    kms_calls: AtomicUsize,
}

impl MockState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", self.token))
    }
}

/// In-process Cloud KMS and Cloud Storage, bound to an ephemeral port.
///
/// KMS keys are AES-256-GCM keys held in memory; ciphertexts are
/// `nonce || sealed`.
pub struct MockCloud {
    pub base_url: String,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockCloud {
    /// Starts the mock, accepting only `token` as bearer credential.
    pub async fn start(token: &str) -> Result<Self> {
        let state = Arc::new(MockState {
            token: token.to_string(),
            ..MockState::default()
        });

        let router = Router::new()
            .route("/v1/{*rest}", post(kms_handler))
            .route("/storage/v1/b/{bucket}/o/{object}", get(gcs_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind mock listener")?;
        let addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            state,
            task,
        })
    }

    /// Creates a KMS key at `resource` (`projects/.../cryptoKeys/...`).
    pub fn add_key(&self, resource: &str) {
        let key = random::generate_key();
        self.state
            .keys
            .lock()
            .unwrap()
            .insert(resource.to_string(), *key);
    }

    /// Stores an object.
    pub fn put_object(&self, bucket: &str, object: &str, data: impl Into<Vec<u8>>) {
        self.state
            .objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), object.to_string()), data.into());
    }

    /// Makes every subsequent KMS request hang forever.
    pub fn hang_kms(&self) {
        self.state.hang_kms.store(true, Ordering::SeqCst);
    }

    /// Number of KMS requests received.
    pub fn kms_calls(&self) -> usize {
        self.state.kms_calls.load(Ordering::SeqCst)
    }

    /// Returns a KMS client for this mock using `token`.
    pub fn kms_client(&self, token: &str) -> CloudKmsClient {
        CloudKmsClient::new(self.base_url.as_str(), Arc::new(StaticToken::new(token)))
    }

    /// Returns a blob store for this mock using `token`.
    pub fn blob_store(&self, token: &str) -> Result<GcsBlobStore> {
        GcsBlobStore::new(&self.base_url, Arc::new(StaticToken::new(token)))
            .context("Failed to create blob store")
    }
}

impl Drop for MockCloud {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn kms_handler(
    State(state): State<Arc<MockState>>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CryptoRequest>,
) -> Response {
    state.kms_calls.fetch_add(1, Ordering::SeqCst);

    if state.hang_kms.load(Ordering::SeqCst) {
        std::future::pending::<()>().await;
    }
    if !state.authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "invalid credentials");
    }

    let Some((resource, method)) = rest.rsplit_once(':') else {
        return error(StatusCode::NOT_FOUND, "no method");
    };
    let Some(key) = state.keys.lock().unwrap().get(resource).copied() else {
        return error(StatusCode::NOT_FOUND, format!("key {resource} not found"));
    };

    match (method, request) {
        (
            "encrypt",
            CryptoRequest {
                plaintext: Some(plaintext),
                ..
            },
        ) => {
            let Ok(plaintext) = BASE64.decode(plaintext) else {
                return error(StatusCode::BAD_REQUEST, "plaintext is not base64");
            };
            let nonce = random::generate_nonce::<{ aead::NONCE_SIZE }>();
            let sealed = aead::seal(&key, &nonce, &plaintext).unwrap();

            let mut ciphertext = nonce.to_vec();
            ciphertext.extend_from_slice(&sealed);

            Json(EncryptResponse {
                name: format!("{resource}/cryptoKeyVersions/1"),
                ciphertext: BASE64.encode(ciphertext),
            })
            .into_response()
        },
        (
            "decrypt",
            CryptoRequest {
                ciphertext: Some(ciphertext),
                ..
            },
        ) => {
            let Ok(ciphertext) = BASE64.decode(ciphertext) else {
                return error(StatusCode::BAD_REQUEST, "ciphertext is not base64");
            };
            if ciphertext.len() < aead::NONCE_SIZE {
                return error(StatusCode::BAD_REQUEST, "ciphertext too short");
            }
            let (nonce, sealed) = ciphertext.split_at(aead::NONCE_SIZE);
            match aead::open(&key, nonce, sealed) {
                Ok(plaintext) => Json(DecryptResponse {
                    plaintext: BASE64.encode(&*plaintext),
                })
                .into_response(),
                Err(_) => error(StatusCode::BAD_REQUEST, "decryption failed"),
            }
        },
        _ => error(StatusCode::BAD_REQUEST, "unsupported request"),
    }
}

async fn gcs_handler(
    State(state): State<Arc<MockState>>,
    Path((bucket, object)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "invalid credentials");
    }
    if query.get("alt").map(String::as_str) != Some("media") {
        return error(StatusCode::BAD_REQUEST, "only alt=media is supported");
    }

    match state.objects.lock().unwrap().get(&(bucket, object)) {
        Some(data) => data.clone().into_response(),
        None => error(StatusCode::NOT_FOUND, "no such object"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use egide_keylist::{KeyList, KeyListError, KeyListProviderFactory};
    use egide_kms::gcp::CloudKmsError;
    use egide_kms::{KeyManagementService, KmsError, KmsFactory, OperationContext, RemoteKms};
    use egide_storage::{BlobStore, StorageError};

    const TOKEN: &str = "ya29.test-token";
    const PROJECT: &str = "qubit-secrets";
    const LOCATION: &str = "global";
    const BUCKET: &str = "qubit-keylists";
    const BUCKET_PATH: &str = "dev/quid-server";
    const RESOURCE: &str =
        "projects/qubit-secrets/locations/global/keyRings/dev/cryptoKeys/quid-server";

    const K1: &str = "fb1f31d201cf6ff10936e28a8f9f003602944d0a9014a9f22f004d923256d36c";
    const K2: &str = "9ee938728c80970dd0cb8c8329bf20f347a4dd747f5520a9c87ef072ae7bb52c";

    async fn mock() -> MockCloud {
        let cloud = MockCloud::start(TOKEN).await.unwrap();
        cloud.add_key(RESOURCE);
        cloud
    }

    fn remote_kms(cloud: &MockCloud, token: &str) -> RemoteKms {
        RemoteKms::new(PROJECT, LOCATION, Arc::new(cloud.kms_client(token)))
    }

    fn factory(cloud: &MockCloud) -> KeyListProviderFactory {
        let kms = KmsFactory::new().with_remote_client(Arc::new(cloud.kms_client(TOKEN)));
        KeyListProviderFactory::new(kms).with_blob_store(Arc::new(cloud.blob_store(TOKEN).unwrap()))
    }

    /// Wraps a key list with the mock KMS and uploads it.
    async fn upload_key_list(cloud: &MockCloud, name: &str, keys: &[&str]) {
        let json = serde_json::to_string(keys).unwrap();
        let wrapped = remote_kms(cloud, TOKEN)
            .encrypt(&OperationContext::new(), BUCKET_PATH, json.as_bytes())
            .await
            .unwrap();
        cloud.put_object(BUCKET, &format!("{BUCKET_PATH}/{name}"), wrapped);
    }

    #[tokio::test]
    async fn test_cloud_kms_roundtrip() {
        let cloud = mock().await;
        let kms = remote_kms(&cloud, TOKEN);
        let ctx = OperationContext::new();

        let ciphertext = kms.encrypt(&ctx, "dev/quid-server", b"boo").await.unwrap();
        assert_ne!(ciphertext, b"boo");

        let plaintext = kms
            .decrypt(&ctx, "dev/quid-server", &ciphertext)
            .await
            .unwrap();
        assert_eq!(&*plaintext, b"boo");
        assert_eq!(cloud.kms_calls(), 2);
    }

    #[tokio::test]
    async fn test_cloud_kms_rejects_bad_token() {
        let cloud = mock().await;
        let kms = remote_kms(&cloud, "wrong");

        let err = kms
            .encrypt(&OperationContext::new(), "dev/quid-server", b"boo")
            .await
            .unwrap_err();

        let KmsError::Transport { operation, source } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(operation, "encrypt");
        let source = source.downcast::<CloudKmsError>().unwrap();
        assert!(matches!(*source, CloudKmsError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_cloud_kms_unknown_key() {
        let cloud = mock().await;
        let kms = remote_kms(&cloud, TOKEN);

        let result = kms
            .decrypt(&OperationContext::new(), "dev/missing", b"ciphertext")
            .await;
        assert!(matches!(result, Err(KmsError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_gcs_read() {
        let cloud = mock().await;
        cloud.put_object(BUCKET, "dev/quid-server/piiKeyList", b"blob".to_vec());
        let store = cloud.blob_store(TOKEN).unwrap();

        let data = store
            .read(BUCKET, "dev/quid-server/piiKeyList")
            .await
            .unwrap();
        assert_eq!(data, b"blob");

        let result = store.read(BUCKET, "dev/quid-server/other").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let result = cloud
            .blob_store("wrong")
            .unwrap()
            .read(BUCKET, "dev/quid-server/piiKeyList")
            .await;
        assert!(matches!(result, Err(StorageError::Http { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_envelope_flow_end_to_end() {
        let cloud = mock().await;
        upload_key_list(&cloud, "piiKeyList", &[K1]).await;

        let provider = factory(&cloud)
            .build("gkms://qubit-secrets:global:qubit-keylists:dev/quid-server")
            .unwrap();
        let ctx = OperationContext::new();

        let v1 = provider.get_key_list(&ctx, "piiKeyList").await.unwrap();
        assert_eq!(v1.len(), 1);
        let old = v1.encrypt("555-12-3456").unwrap();

        // Rotate: upload a list with a new key appended.
        upload_key_list(&cloud, "piiKeyList", &[K1, K2]).await;

        let v2 = provider.get_key_list(&ctx, "piiKeyList").await.unwrap();
        assert_eq!(v2.len(), 2);
        assert_eq!(v2.decrypt(&old).unwrap(), "555-12-3456");

        let new = v2.encrypt("555-98-7654").unwrap();
        assert_eq!(KeyList::new([K2]).unwrap().decrypt(&new).unwrap(), "555-98-7654");
        assert!(v1.decrypt(&new).is_err());
    }

    #[tokio::test]
    async fn test_envelope_missing_list() {
        let cloud = mock().await;
        let provider = factory(&cloud)
            .build("remote://qubit-secrets:global:qubit-keylists:dev/quid-server")
            .unwrap();

        let result = provider
            .get_key_list(&OperationContext::new(), "absent")
            .await;
        assert!(matches!(
            result,
            Err(KeyListError::Fetch {
                source: StorageError::NotFound(_),
                ..
            })
        ));
        assert_eq!(cloud.kms_calls(), 0);
    }

    #[tokio::test]
    async fn test_envelope_wrong_kms_key() {
        let cloud = mock().await;
        // Wrapped under a different key than the one named by the path.
        cloud.put_object(BUCKET, "dev/quid-server/piiKeyList", vec![0u8; 48]);

        let provider = factory(&cloud)
            .build("remote://qubit-secrets:global:qubit-keylists:dev/quid-server")
            .unwrap();

        let result = provider
            .get_key_list(&OperationContext::new(), "piiKeyList")
            .await;
        assert!(matches!(
            result,
            Err(KeyListError::Unwrap { ref key_spec, .. }) if key_spec == BUCKET_PATH
        ));
    }

    #[tokio::test]
    async fn test_cancel_hanging_kms_request() {
        let cloud = mock().await;
        cloud.hang_kms();
        let kms = remote_kms(&cloud, TOKEN);

        let ctx = OperationContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            kms.decrypt(&ctx, "dev/quid-server", b"ciphertext"),
        )
        .await
        .expect("cancellation did not abort the request");

        assert!(matches!(
            result,
            Err(KmsError::Cancelled {
                operation: "decrypt"
            })
        ));
    }

    #[tokio::test]
    async fn test_deadline_on_envelope_unwrap() {
        let cloud = mock().await;
        cloud.put_object(BUCKET, "dev/quid-server/piiKeyList", vec![1u8; 48]);
        cloud.hang_kms();

        let provider = factory(&cloud)
            .build("gkms://qubit-secrets:global:qubit-keylists:dev/quid-server")
            .unwrap();
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(200));

        let result = provider.get_key_list(&ctx, "piiKeyList").await;
        assert!(matches!(
            result,
            Err(KeyListError::Interrupted {
                operation: "unwrap",
                reason: egide_kms::Interrupted::DeadlineExceeded
            })
        ));
    }
}
