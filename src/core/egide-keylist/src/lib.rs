//! # Egide Key Lists
//!
//! Versioned symmetric encryption that survives key rotation.
//!
//! A [`KeyList`] is an ordered set of 256-bit keys, oldest first. New
//! ciphertexts are always sealed with the newest key; decryption tries every
//! key, oldest first. Appending a key rotates without migrating data, as long
//! as old keys stay in the list.
//!
//! ## Ciphertext Format
//!
//! `base64url(nonce (24 bytes) || secretbox(tag || ciphertext))`
//!
//! ## Providers
//!
//! Key lists are obtained from a [`KeyListProvider`]:
//! - [`StaticKeyListProvider`] - name to JSON text, in memory or from a file
//! - [`EnvelopeKeyListProvider`] - an encrypted blob fetched from storage and
//!   unwrapped by a KMS

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod factory;
pub mod keylist;
pub mod provider;

pub use error::KeyListError;
pub use factory::KeyListProviderFactory;
pub use keylist::KeyList;
pub use provider::{EnvelopeConfig, EnvelopeKeyListProvider, KeyListProvider, StaticKeyListProvider};
