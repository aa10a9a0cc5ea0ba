//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while turning wire bytes into typed objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload is not valid base64 or not a well-formed packet.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The payload decoded, but into the wrong kind of structure.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Core errors outside of decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("entropy source failed: {0}")]
    Entropy(String),

    #[error("key encoding error: {0}")]
    KeyEncoding(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
