//! Media-stream WebSocket route configuration
//!
//! This module configures the WebSocket endpoint the telephony provider
//! connects to for a call's audio.
//!
//! # Endpoint
//!
//! `GET /media` - WebSocket upgrade for one call's media stream
//!
//! # Protocol
//!
//! After the upgrade the provider sends JSON events (`start`, `media`,
//! `mark`, `stop`); the bridge answers with `media`, `mark`, and `tts`
//! messages. See `core::telephony::messages` for the wire format.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream router
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
