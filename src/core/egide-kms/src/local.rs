//! Local AES-GCM backend.
//!
//! The key specifier carries both the key and the nonce:
//! `<hex key>/<hex nonce>`, key 16 bytes (AES-128) or 32 bytes (AES-256),
//! nonce 12 bytes, either hex case.
//!
//! # Nonce reuse
//!
//! The nonce is part of the wire contract and is never generated here.
//! Callers MUST use a fresh nonce for every encryption under a given key:
//! sealing two messages with the same `(key, nonce)` pair breaks GCM.

use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroizing;

use egide_crypto::{aead, CryptoError};

use crate::{KeyManagementService, KmsError, OperationContext};

const KEY_HINT: &str = "key must be 16 bytes (AES-128) or 32 bytes (AES-256), encoded as hex";
const NONCE_HINT: &str = "nonce must be 12 bytes encoded as hex";

/// Decoded `<key>/<nonce>` pair.
struct LocalKeySpec {
    key: Zeroizing<Vec<u8>>,
    nonce: Vec<u8>,
}

impl LocalKeySpec {
    fn parse(key_spec: &str) -> Result<Self, KmsError> {
        let mut parts = key_spec.split('/');
        let (Some(key_hex), Some(nonce_hex)) = (parts.next(), parts.next()) else {
            // The specifier holds key material, keep it out of the error.
            return Err(KmsError::MalformedKeySpecifier(
                "expecting <key>/<nonce>".into(),
            ));
        };

        let key = Zeroizing::new(
            hex::decode(key_hex).map_err(|_| KmsError::InvalidKeyEncoding(KEY_HINT.into()))?,
        );
        if key.len() != aead::KEY_SIZE_128 && key.len() != aead::KEY_SIZE_256 {
            return Err(KmsError::InvalidKeyEncoding(KEY_HINT.into()));
        }

        let nonce =
            hex::decode(nonce_hex).map_err(|_| KmsError::InvalidNonceEncoding(NONCE_HINT.into()))?;
        if nonce.len() != aead::NONCE_SIZE {
            return Err(KmsError::InvalidNonceEncoding(NONCE_HINT.into()));
        }

        Ok(Self { key, nonce })
    }
}

/// In-process KMS performing AES-GCM with caller-supplied key and nonce.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKms;

impl LocalKms {
    /// Backend name.
    pub const BACKEND: &'static str = "local";

    /// Creates the backend. It holds no state.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyManagementService for LocalKms {
    async fn encrypt(
        &self,
        ctx: &OperationContext,
        key_spec: &str,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KmsError> {
        ctx.check()
            .map_err(|i| KmsError::interrupted(i, "encrypt"))?;

        let spec = LocalKeySpec::parse(key_spec)?;
        debug!(bytes = plaintext.len(), "Local KMS encrypt");

        Ok(aead::seal(&spec.key, &spec.nonce, plaintext)?)
    }

    async fn decrypt(
        &self,
        ctx: &OperationContext,
        key_spec: &str,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, KmsError> {
        ctx.check()
            .map_err(|i| KmsError::interrupted(i, "decrypt"))?;

        let spec = LocalKeySpec::parse(key_spec)?;
        debug!(bytes = ciphertext.len(), "Local KMS decrypt");

        aead::open(&spec.key, &spec.nonce, ciphertext).map_err(|e| match e {
            CryptoError::DecryptionFailed(_) => KmsError::AuthenticationFailure,
            other => KmsError::Crypto(other),
        })
    }

    fn backend(&self) -> &'static str {
        Self::BACKEND
    }
}
