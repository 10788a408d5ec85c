//! # Egide KMS
//!
//! Key Management Service abstraction used for envelope encryption.
//!
//! ## Backends
//!
//! - `local://` - AES-GCM with the key and nonce carried in the key specifier
//! - `remote://<project>:<location>` - an external key management service
//!   reached through an injected [`RemoteKmsClient`] (Cloud KMS over HTTP
//!   is provided by [`gcp::CloudKmsClient`])
//!
//! Backends are selected from a configuration string of the form
//! `<provider>://<field1>:<field2>:...` (see [`spec`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod factory;
pub mod gcp;
pub mod local;
pub mod remote;
pub mod service;
pub mod spec;

pub use context::{Interrupted, OperationContext};
pub use error::{BoxError, KmsError, SpecError};
pub use factory::{KmsFactory, KmsProvider};
pub use local::LocalKms;
pub use remote::{RemoteKms, RemoteKmsClient};
pub use service::KeyManagementService;
pub use spec::ConfigSpec;
