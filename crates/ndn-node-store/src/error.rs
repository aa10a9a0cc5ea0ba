//! Error types for the store module.

use ndn_node_core::CodecError;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored packet failed to decode.
    #[error("stored value is not a valid packet: {0}")]
    Codec(#[from] CodecError),

    /// The storage handle was closed.
    #[error("storage is closed")]
    Closed,

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The blocking worker panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
