//! Key management service trait definition.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::{KmsError, OperationContext};

/// Envelope encrypt/decrypt capability.
///
/// `key_spec` is backend specific: `<hex key>/<hex nonce>` for the local
/// backend, `<keyring>/<key>` for the remote one.
#[async_trait]
pub trait KeyManagementService: Send + Sync {
    /// Encrypts `plaintext` with the key named by `key_spec`.
    async fn encrypt(
        &self,
        ctx: &OperationContext,
        key_spec: &str,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KmsError>;

    /// Decrypts `ciphertext` with the key named by `key_spec`.
    ///
    /// The plaintext is wrapped in `Zeroizing`: it is usually key material.
    async fn decrypt(
        &self,
        ctx: &OperationContext,
        key_spec: &str,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, KmsError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend(&self) -> &'static str;
}
