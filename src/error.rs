use std::io;
use thiserror::Error;

/// Errors that can occur in listen-along operations
#[derive(Debug, Error)]
pub enum ListenAlongError {
    // ===== Authentication Errors =====
    /// Credential was missing, invalid, or rejected by the directory
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the failure
        message: String,
    },

    // ===== Transport Errors =====
    /// Operation attempted while the connection is not open
    #[error("transport unavailable: {operation}")]
    TransportUnavailable {
        /// The operation that could not be performed
        operation: String,
    },

    /// Connection was closed by the peer
    #[error("connection closed")]
    ConnectionClosed,

    /// WebSocket protocol error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    // ===== Protocol Errors =====
    /// Frame could not be parsed as a known message
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    // ===== State Errors =====
    /// Operation not valid in current state
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
    },
}

impl ListenAlongError {
    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::Network(_) | Self::WebSocket(_)
        )
    }

    /// Check if this error should be handled by degrading rather than failing
    ///
    /// Real-time-path failures (sync, broadcast) fail open: the feature
    /// degrades to unsynchronized-but-playable instead of erroring out.
    #[must_use]
    pub fn is_fail_open(&self) -> bool {
        matches!(
            self,
            Self::TransportUnavailable { .. } | Self::ConnectionClosed
        )
    }
}

/// Result type alias for listen-along operations
pub type Result<T> = std::result::Result<T, ListenAlongError>;
