//! XSalsa20-Poly1305 secret boxes.
//!
//! Byte-compatible with NaCl `crypto_secretbox`: the sealed output is
//! `tag (16 bytes) || ciphertext`. The 24-byte nonce is large enough to be
//! drawn at random for every message.

use crypto_secretbox::{
    aead::{Aead, KeyInit, Nonce},
    XSalsa20Poly1305,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::keys::SecretKey;

/// Size of a secretbox nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Seals `plaintext` under `key` and `nonce`.
pub fn seal(
    key: &SecretKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XSalsa20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    cipher
        .encrypt(Nonce::<XSalsa20Poly1305>::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Opens a box produced by [`seal`].
pub fn open(
    key: &SecretKey,
    nonce: &[u8; NONCE_SIZE],
    sealed: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if sealed.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed("box too short".to_string()));
    }

    let cipher = XSalsa20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    cipher
        .decrypt(Nonce::<XSalsa20Poly1305>::from_slice(nonce), sealed)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
}
