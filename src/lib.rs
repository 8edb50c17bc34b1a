//! # Jwks-Kit: Signing Key Lifecycle Management
//!
//! `jwks-kit` manages the lifecycle of the cryptographic keys an identity
//! provider uses to issue and validate tokens: it resolves an algorithm
//! policy, generates fresh key material, rotates keys on a time policy
//! through a pluggable store, and projects the public key set published in a
//! JWKS discovery document.
//!
//! ## Core Concepts
//!
//! - **`JwksService`**: the rotation engine. Asked for the current signing or
//!   encrypting credentials, it reuses the newest valid key or generates and
//!   persists a new one, lazily, on access.
//! - **`JsonWebKeyStore`**: a trait for integrating storage backends.
//!   `jwks-kit` ships in-memory, filesystem and encrypted-filesystem
//!   implementations.
//! - **`KeySetProjector`**: builds the `{"keys":[...]}` key set served from a
//!   discovery endpoint, public components only, symmetric keys excluded.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jwks_kit::prelude::*;
//!
//! fn main() -> Result<(), Error> {
//!     let store = Arc::new(FileSystemKeyStore::new("./keys")?);
//!     let service = JwksService::new(store.clone(), JwksOptions::default())?;
//!
//!     // Issue: the private view, for the token signer.
//!     let credentials = service.current_signing_credentials()?;
//!     println!("signing with kid {}", credentials.key_id);
//!
//!     // Publish: the public view, for relying parties.
//!     let projector = KeySetProjector::new(store);
//!     let key_set = projector.build_key_set(KeyUsage::Signing, 2)?;
//!     println!("{}", serde_json::to_string(&key_set)?);
//!     Ok(())
//! }
//! ```

pub mod algorithms;
pub mod common;
pub mod error;
pub mod jwk;
pub mod jwks;
pub mod keys;
pub mod rotation;
pub mod storage;

pub use algorithms::{Algorithm, EcCurve, KeyFamily, KeyParams, KeyUsage};
pub use common::config::JwksOptions;
pub use error::Error;
pub use jwk::JsonWebKey;
pub use jwks::{JsonWebKeySet, KeySetProjector};
pub use keys::generator::KeyGenerator;
pub use keys::record::{KeyCredentials, KeyRecord};
pub use rotation::JwksService;
pub use storage::traits::JsonWebKeyStore;

// --- Prelude ---
// A collection of the most commonly used traits, structs and enums.
pub mod prelude {
    pub use crate::algorithms::{Algorithm, KeyFamily, KeyUsage};
    pub use crate::common::config::JwksOptions;
    pub use crate::error::Error;
    pub use crate::jwk::JsonWebKey;
    pub use crate::jwks::{JsonWebKeySet, KeySetProjector};
    pub use crate::keys::record::{KeyCredentials, KeyRecord};
    pub use crate::rotation::JwksService;
    pub use crate::storage::file::FileSystemKeyStore;
    pub use crate::storage::memory::InMemoryKeyStore;
    pub use crate::storage::traits::JsonWebKeyStore;

    #[cfg(feature = "secure-storage")]
    pub use crate::storage::encrypted::EncryptedFileSystemKeyStore;
}

/// The version of the `jwks-kit` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
