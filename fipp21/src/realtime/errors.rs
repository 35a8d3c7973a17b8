//! Realtime error types.
//!
//! None of these reach dispatcher callers: transport failures feed the
//! reconnect cycle and malformed frames are logged and dropped.

use std::time::Duration;

use thiserror::Error;

/// Why an incoming frame could not be dispatched
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not valid JSON
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Binary frame that is not UTF-8 text
    #[error("Binary frame is not UTF-8 text")]
    NotText,

    /// Parsed, but neither `type` nor `event` names an event
    #[error("Frame has no event type")]
    MissingDiscriminator,
}

/// Connection-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Handshake or socket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Handshake did not complete in time
    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),
}
