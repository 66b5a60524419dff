//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `calls` - Outbound dialing, campaign loop, and the TwiML webhook
//! - `leads` - Lead CRUD, conversation history, CSV import
//! - `media` - Media-stream WebSocket (the call bridge)
//! - `recording` - Recording download endpoint

pub mod api;
pub mod calls;
pub mod leads;
pub mod media;
pub mod recording;

// Re-export commonly used handlers for convenient access
pub use media::media_stream_handler;
