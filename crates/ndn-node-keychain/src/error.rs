//! Error types for the keychain.

use ndn_node_core::{CodecError, Name, ValidityPeriod};
use ndn_node_store::StoreError;
use thiserror::Error;

/// Errors that can occur while unwrapping, issuing or checking credentials.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// AEAD authentication failed: the passphrase does not open the bundle.
    #[error("wrong passphrase")]
    WrongPassphrase,

    /// The bundle opened, but its contents are not usable key material.
    #[error("corrupt key bundle: {0}")]
    CorruptBundle(String),

    /// The entropy source or key primitive failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailure(String),

    /// The certificate is not one delegation hop from the trust anchor.
    #[error("certificate {name} is not trusted: {reason}")]
    Untrusted { name: Name, reason: String },

    /// The certificate exists and chains, but not at this time.
    #[error("certificate {name} is outside its validity period {validity}")]
    Expired { name: Name, validity: ValidityPeriod },

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decoding error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Publishing certificates to session storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;
