//! Media-stream WebSocket handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use tracing::info;

use crate::core::bridge;
use crate::state::AppState;

/// Maximum WebSocket message size (media frames are small, but keep room
/// for provider bursts).
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// GET /media - upgrade to the media-stream WebSocket.
///
/// The telephony provider connects here once a call's TwiML answers with a
/// `<Connect><Stream>`. Each upgraded socket gets its own bridge task; no
/// state is shared between concurrent calls.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream upgrade requested");
    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| bridge::run(socket, state))
}
