//! # Egide Crypto
//!
//! Core cryptographic primitives for Nubster Egide key lists and KMS backends.
//!
//! This crate provides:
//! - AES-GCM with caller-supplied nonces (local KMS envelopes)
//! - XSalsa20-Poly1305 secret boxes (rotation key lists)
//! - Zeroizing secret keys
//! - Secure random generation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod error;
pub mod keys;
pub mod random;
pub mod secretbox;

pub use error::CryptoError;
pub use keys::SecretKey;
