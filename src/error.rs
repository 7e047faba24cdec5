//! Error types for relaylink
//!
//! Provides a unified error type for all operations. Orderly peer closure is
//! not an error: the codec reports it as `Ok(None)` and the session loop as
//! [`SessionEnd::PeerClosed`](crate::network::SessionEnd).

use thiserror::Error;

use crate::session::HandshakeFailure;

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type for relaylink operations
#[derive(Debug, Error)]
pub enum RelayError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A read or write deadline expired. Distinct from closure.
    #[error("Timed out waiting on transport")]
    Timeout,

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Encoding error: payload of {size} bytes does not fit a 32-bit length prefix")]
    Encoding { size: usize },

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Message Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Handshake failed: {0}")]
    Handshake(HandshakeFailure),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// True when the error is a deadline expiry rather than a real failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, RelayError::Timeout)
    }

    /// Map an I/O error, folding the platform-specific deadline kinds into
    /// [`RelayError::Timeout`]. Unix reports `WouldBlock`, Windows `TimedOut`.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => RelayError::Timeout,
            _ => RelayError::Io(err),
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Decode(err.to_string())
    }
}
