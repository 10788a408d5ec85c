//! KMS error types.

use thiserror::Error;

/// Opaque error returned by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while parsing a `<provider>://<fields>` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// The spec string is empty.
    #[error("spec string is blank")]
    EmptySpec,

    /// No `://` separator, or nothing before it.
    #[error("spec string has no provider")]
    MissingProvider,
}

/// Errors that can occur in KMS operations.
#[derive(Debug, Error)]
pub enum KmsError {
    /// Invalid configuration string.
    #[error("invalid kms spec: {0}")]
    Spec(#[from] SpecError),

    /// Provider name not recognized.
    #[error("provider not implemented: {0}")]
    UnknownProvider(String),

    /// The configuration string does not carry enough fields.
    #[error("invalid {provider} spec: expecting {usage}, got {got} field(s)")]
    InsufficientFields {
        /// Provider name.
        provider: String,
        /// Expected layout, e.g. `remote://<project>:<location>`.
        usage: &'static str,
        /// Number of fields present.
        got: usize,
    },

    /// Backend wiring error (e.g. a remote client was not supplied).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Key specifier does not have the `<a>/<b>` shape the backend expects.
    #[error("malformed key specifier: {0}")]
    MalformedKeySpecifier(String),

    /// Key part of the specifier is not valid hex or has the wrong size.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Nonce part of the specifier is not valid hex or has the wrong size.
    #[error("invalid nonce encoding: {0}")]
    InvalidNonceEncoding(String),

    /// The remote service returned a payload that is not valid base64.
    #[error("invalid base64 in {operation} response: {message}")]
    Encoding {
        /// Operation name.
        operation: &'static str,
        /// Decoder message.
        message: String,
    },

    /// AEAD tag check failed.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] egide_crypto::CryptoError),

    /// The external service call failed.
    #[error("remote kms {operation} failed: {source}")]
    Transport {
        /// Operation name.
        operation: &'static str,
        /// Error reported by the collaborator, untouched.
        #[source]
        source: BoxError,
    },

    /// The operation context was cancelled.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation name.
        operation: &'static str,
    },

    /// The operation context deadline passed.
    #[error("{operation} deadline exceeded")]
    DeadlineExceeded {
        /// Operation name.
        operation: &'static str,
    },
}

impl KmsError {
    /// Maps an interrupted context to the matching error for `operation`.
    pub fn interrupted(interrupted: crate::Interrupted, operation: &'static str) -> Self {
        match interrupted {
            crate::Interrupted::Cancelled => Self::Cancelled { operation },
            crate::Interrupted::DeadlineExceeded => Self::DeadlineExceeded { operation },
        }
    }
}
