//! AES-GCM authenticated encryption with a caller-supplied nonce.
//!
//! Used by the local KMS backend, where the key and the nonce both travel in
//! the key specifier. Supports AES-128-GCM and AES-256-GCM, selected by the
//! key length.
//!
//! The nonce is NOT generated here. Sealing two messages under the same
//! `(key, nonce)` pair destroys GCM confidentiality and authenticity, so
//! callers must never reuse a nonce with a given key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Size of an AES-128 key in bytes.
pub const KEY_SIZE_128: usize = 16;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE_256: usize = 32;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

enum GcmCipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl GcmCipher {
    fn new(key: &[u8]) -> Result<Self, CryptoError> {
        match key.len() {
            KEY_SIZE_128 => Aes128Gcm::new_from_slice(key)
                .map(Self::Aes128)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            KEY_SIZE_256 => Aes256Gcm::new_from_slice(key)
                .map(Self::Aes256)
                .map_err(|e| CryptoError::InvalidKey(e.to_string())),
            n => Err(CryptoError::InvalidKey(format!(
                "expected {} or {} bytes, got {}",
                KEY_SIZE_128, KEY_SIZE_256, n
            ))),
        }
    }
}

fn check_nonce(nonce: &[u8]) -> Result<&Nonce<aes_gcm::aead::consts::U12>, CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonce(format!(
            "expected {} bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }
    Ok(Nonce::from_slice(nonce))
}

/// Seals `plaintext` with AES-GCM under `key` and `nonce`, without
/// associated data.
///
/// # Returns
///
/// `ciphertext || tag (16 bytes)`. The nonce is not included.
pub fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = GcmCipher::new(key)?;
    let nonce = check_nonce(nonce)?;

    let sealed = match cipher {
        GcmCipher::Aes128(c) => c.encrypt(nonce, plaintext),
        GcmCipher::Aes256(c) => c.encrypt(nonce, plaintext),
    };

    sealed.map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Opens a ciphertext produced by [`seal`] with the same key and nonce.
///
/// Returns the plaintext wrapped in `Zeroizing` for automatic memory cleanup.
pub fn open(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let cipher = GcmCipher::new(key)?;
    let nonce = check_nonce(nonce)?;

    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed(
            "ciphertext too short".to_string(),
        ));
    }

    let opened = match cipher {
        GcmCipher::Aes128(c) => c.decrypt(nonce, ciphertext),
        GcmCipher::Aes256(c) => c.decrypt(nonce, ciphertext),
    };

    opened
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
}
