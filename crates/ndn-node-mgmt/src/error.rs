//! Error types for the management module.

use ndn_node_core::{CodecError, Name};
use thiserror::Error;

/// Errors that can occur while connecting, exchanging packets or
/// registering prefixes.
#[derive(Debug, Error)]
pub enum MgmtError {
    /// The transport could not be opened.
    #[error("unable to connect to {endpoint}: {cause}")]
    ConnectFailure { endpoint: String, cause: String },

    /// No router could be found.
    #[error("router discovery failed: {0}")]
    DiscoveryFailure(String),

    /// The forwarding daemon answered with a non-200 status.
    #[error("unable to register route {prefix}: {status_code} {status_text}")]
    RegistrationRejected {
        prefix: Name,
        status_code: u32,
        status_text: String,
    },

    /// No Data arrived within the Interest lifetime.
    #[error("timeout waiting for {0}")]
    Timeout(Name),

    /// The face was closed while the operation was in flight.
    #[error("face closed")]
    FaceClosed,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Decoding error.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type for management operations.
pub type Result<T> = std::result::Result<T, MgmtError>;
