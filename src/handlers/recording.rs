use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

use crate::state::AppState;

const CONTENT_TYPE: &str = "audio/wav";

fn is_valid_stream_id(stream_id: &str) -> bool {
    !stream_id.is_empty() && !stream_id.contains("..") && !stream_id.contains('/')
}

fn is_valid_track(track: &str) -> bool {
    matches!(track, "inbound" | "outbound")
}

/// Download one track of a finalized call recording.
///
/// `GET /recordings/{stream_sid}/{track}` where `track` is `inbound`
/// (caller audio) or `outbound` (assistant audio).
pub async fn download_recording(
    State(state): State<Arc<AppState>>,
    Path((stream_sid, track)): Path<(String, String)>,
) -> Response {
    info!(
        stream_sid = %stream_sid,
        track = %track,
        "Recording download requested"
    );

    if !is_valid_stream_id(&stream_sid) {
        error!("Invalid stream_sid format for recording download: {}", stream_sid);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid stream_sid format"})),
        )
            .into_response();
    }

    if !is_valid_track(&track) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "track must be 'inbound' or 'outbound'"})),
        )
            .into_response();
    }

    let path = state.recorder.track_path(&stream_sid, &track);
    let body = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "Recording not found for stream_sid={} track={}",
                stream_sid, track
            );
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("Recording not found: {stream_sid}/{track}")})),
            )
                .into_response();
        }
        Err(e) => {
            error!(
                "Failed to read recording for stream_sid={}: {}",
                stream_sid, e
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to read recording"})),
            )
                .into_response();
        }
    };

    info!(
        "Recording download successful - stream_sid={}, track={}, size={} bytes",
        stream_sid,
        track,
        body.len()
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    if let Ok(len) = HeaderValue::from_str(&body.len().to_string()) {
        headers.insert(header::CONTENT_LENGTH, len);
    }
    if let Ok(disposition) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{stream_sid}-{track}.wav\""
    )) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    (StatusCode::OK, headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_stream_id_empty() {
        assert!(!is_valid_stream_id(""));
    }

    #[test]
    fn test_invalid_stream_id_path_traversal() {
        assert!(!is_valid_stream_id("../etc/passwd"));
        assert!(!is_valid_stream_id(".."));
    }

    #[test]
    fn test_invalid_stream_id_contains_slash() {
        assert!(!is_valid_stream_id("abc/123"));
    }

    #[test]
    fn test_valid_stream_id() {
        assert!(is_valid_stream_id("MZ18ad3ab5"));
        assert!(is_valid_stream_id("call-123"));
    }

    #[test]
    fn test_track_validation() {
        assert!(is_valid_track("inbound"));
        assert!(is_valid_track("outbound"));
        assert!(!is_valid_track("sideways"));
        assert!(!is_valid_track(""));
    }
}
