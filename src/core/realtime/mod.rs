//! Realtime AI connection.
//!
//! One persistent WebSocket per call carries JSON frames both ways: we push
//! caller audio and control events up, the AI pushes text deltas and
//! synthesized audio back. The [`client`] owns the socket and translates
//! server frames into [`AiEvent`]s the bridge consumes; the session
//! semantics (accumulating text, playback marks, timers) live in
//! [`crate::core::bridge`].

pub mod client;
pub mod config;
pub mod messages;

pub use client::{AiEvent, RealtimeClient};
pub use config::{RealtimeConfig, REALTIME_AUDIO_FORMAT};
pub use messages::{ClientEvent, ServerEvent};

use thiserror::Error;

/// Errors from the realtime connection.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
