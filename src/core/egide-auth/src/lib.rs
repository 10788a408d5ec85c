//! # Egide Auth
//!
//! Credentials for the HTTP collaborators (Cloud KMS, Cloud Storage).
//!
//! Ambient credentials are never read implicitly by the clients: a
//! [`TokenSource`] is handed to each client at construction time.
//!
//! ## Supported Sources
//!
//! - Static bearer token
//! - Environment variable (read on every call)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod source;

pub use error::AuthError;
pub use source::{EnvToken, StaticToken, TokenSource};
