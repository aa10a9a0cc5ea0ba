//! Error types for a node session.

use ndn_node_core::CodecError;
use ndn_node_keychain::KeychainError;
use ndn_node_mgmt::MgmtError;
use ndn_node_store::StoreError;
use thiserror::Error;

/// Errors that abort a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Trust material could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Unwrapping, issuing or trusting a key failed.
    #[error("keychain error: {0}")]
    Keychain(#[from] KeychainError),

    /// Transport, discovery or registration failed.
    #[error("management error: {0}")]
    Mgmt(#[from] MgmtError),

    /// Session storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The workload returned an error.
    #[error("workload failed: {0:#}")]
    Workload(anyhow::Error),

    /// A session runs at most once.
    #[error("session already started")]
    AlreadyStarted,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
