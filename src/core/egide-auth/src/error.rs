//! Credential error types.

use thiserror::Error;

/// Errors that can occur while obtaining credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token is available from the source.
    #[error("missing access token: {0}")]
    MissingToken(String),

    /// Source configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}
