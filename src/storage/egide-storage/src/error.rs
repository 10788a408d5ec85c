//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Invalid bucket or object path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// The storage service answered with an error status.
    #[error("http {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the service.
        body: String,
    },

    /// Credentials could not be obtained.
    #[error("auth error: {0}")]
    Auth(#[from] egide_auth::AuthError),

    /// Generic I/O error.
    #[error("io error: {0}")]
    Io(String),
}
