//! Key list error types.

use thiserror::Error;

/// Errors that can occur while loading or using key lists.
#[derive(Debug, Error)]
pub enum KeyListError {
    /// Named key list does not exist in the provider.
    #[error("cannot find keylist {0}")]
    NotFound(String),

    /// Key list source is not a JSON array of 32-byte hex keys.
    #[error("invalid keylist format: {0}")]
    InvalidFormat(String),

    /// Key list source has no keys.
    #[error("keylist has no keys")]
    EmptyKeyList,

    /// Ciphertext to decrypt is empty.
    #[error("cannot decrypt empty ciphertext")]
    EmptyCiphertext,

    /// Ciphertext is not valid base64url.
    #[error("invalid ciphertext encoding: {0}")]
    Encoding(String),

    /// No key in the list opens the ciphertext.
    #[error("cannot decrypt with any key")]
    NoMatchingKey,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted plaintext is not valid utf-8")]
    InvalidPlaintext,

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] egide_crypto::CryptoError),

    /// Reading the encrypted key list blob failed.
    #[error("fetching {path}: {source}")]
    Fetch {
        /// Object path inside the bucket.
        path: String,
        /// Storage error, untouched.
        #[source]
        source: egide_storage::StorageError,
    },

    /// KMS decryption of the fetched blob failed.
    #[error("unwrapping with {key_spec}: {source}")]
    Unwrap {
        /// Key specifier passed to the KMS.
        key_spec: String,
        /// KMS error, untouched.
        #[source]
        source: egide_kms::KmsError,
    },

    /// The unwrapped plaintext is not a valid key list.
    #[error("parsing keylist {name}: {source}")]
    Parse {
        /// Key list name.
        name: String,
        /// Format error.
        #[source]
        source: Box<KeyListError>,
    },

    /// The operation context was cancelled or its deadline passed.
    #[error("{operation} interrupted: {reason}")]
    Interrupted {
        /// Step that was interrupted.
        operation: &'static str,
        /// Cancellation or deadline.
        reason: egide_kms::Interrupted,
    },

    /// Provider configuration error.
    #[error("kms error: {0}")]
    Kms(#[from] egide_kms::KmsError),

    /// Reading a key list file failed.
    #[error("io error: {0}")]
    Io(String),
}
