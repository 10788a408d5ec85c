//! # Egide Storage
//!
//! Blob storage abstraction layer for encrypted key lists.
//!
//! Provides the [`BlobStore`] read contract and three backends:
//! - [`MemoryBlobStore`] for tests and embedded fixtures
//! - [`FsBlobStore`] for a local directory tree
//! - [`GcsBlobStore`] for Google Cloud Storage over its JSON API

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod fs;
pub mod gcs;
pub mod memory;

pub use backend::BlobStore;
pub use error::StorageError;
pub use fs::FsBlobStore;
pub use gcs::GcsBlobStore;
pub use memory::MemoryBlobStore;
