//! WebSocket errors.

use std::time::Duration;

use thiserror::Error;

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors raised while upgrading or using a WebSocket.
#[derive(Debug, Error)]
pub enum WsError {
    /// The request is not a valid upgrade request.
    #[error("not a WebSocket upgrade request: {0}")]
    InvalidUpgrade(String),

    /// The connection could not be switched to the WebSocket protocol.
    #[error("WebSocket upgrade failed: {0}")]
    UpgradeFailed(String),

    /// The upgraded stream did not become available in time.
    #[error("WebSocket upgrade timed out after {0:?}")]
    UpgradeTimeout(Duration),

    /// The socket is closed; nothing more can be sent.
    #[error("WebSocket connection closed")]
    Closed,

    /// A message payload could not be encoded or decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A message was not the expected kind.
    #[error("unexpected message: expected {expected}")]
    UnexpectedMessage {
        /// What the caller asked for.
        expected: &'static str,
    },

    /// Protocol or transport error.
    #[error(transparent)]
    Protocol(#[from] tungstenite::Error),
}

impl WsError {
    /// Whether the error ends the connection.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Json(_) | Self::UnexpectedMessage { .. })
    }
}
