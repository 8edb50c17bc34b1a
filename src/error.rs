//! Defines the custom error type for the `jwks-kit` crate.

use thiserror::Error;

/// The main error type for the `jwks-kit` crate.
///
/// The first four variants form the lifecycle taxonomy: a configuration
/// problem (`UnsupportedAlgorithm`) is fatal at construction time, a primitive
/// failure (`Generation`) is fatal for the current request, a `DuplicateKeyId`
/// from a store is retried exactly once by the rotation engine, and `Store`
/// surfaces backend failures to the caller unmodified.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("key generation failed: {0}")]
    Generation(String),

    #[error("duplicate key id: {0}")]
    DuplicateKeyId(String),

    #[error("key store failure: {0}")]
    Store(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("decoding from Base64 failed: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error("cryptography error: {0}")]
    Cryptography(String),

    #[error("invalid data format: {0}")]
    FormatError(String),
}
