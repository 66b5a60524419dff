//! Realtime API WebSocket message types.
//!
//! All frames are JSON, discriminated by a `type` field.
//!
//! Client events (sent to the AI):
//! - `session.update` - declare audio format, voice, instructions, modalities
//! - `input_audio_buffer.append` - forward caller audio
//! - `input_audio_buffer.speech_stopped` - explicit end-of-utterance signal
//! - `input_text.append` - synthetic text nudges (silence check-in, keep-alive)
//!
//! Server events (received from the AI):
//! - `session.created` - session established
//! - `response.text.delta` - incremental assistant text
//! - `response.content.done` - assistant turn complete
//! - `response.audio.delta` - base64 chunk of synthesized audio
//! - `error` - provider error

use serde::{Deserialize, Serialize};

// =============================================================================
// Session configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub modalities: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    pub voice: String,

    pub input_audio_format: String,

    pub output_audio_format: String,

    /// Server-driven turn detection: the AI decides when the caller has
    /// stopped speaking; the bridge does no voice-activity detection of
    /// its own.
    pub turn_detection: TurnDetection,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad {
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
}

impl Default for TurnDetection {
    fn default() -> Self {
        TurnDetection::ServerVad {
            threshold: Some(0.5),
            silence_duration_ms: Some(500),
        }
    }
}

// =============================================================================
// Client events (sent to the AI)
// =============================================================================

/// Client events sent over the realtime connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Append caller audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio
        audio: String,
    },

    /// Explicit end-of-utterance signal
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped,

    /// Synthetic text appended to the conversation
    #[serde(rename = "input_text.append")]
    InputTextAppend { text: String },
}

impl ClientEvent {
    /// Audio-append event from an already base64-encoded payload.
    ///
    /// Telephony media arrives base64 encoded in the stream format the AI
    /// session is configured for, so no re-encode is needed.
    pub fn audio_append(payload_b64: &str) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload_b64.to_string(),
        }
    }
}

// =============================================================================
// Server events (received from the AI)
// =============================================================================

/// Server events received over the realtime connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error { error: ApiError },

    /// Session established
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Option<serde_json::Value>,
    },

    /// Incremental assistant text
    #[serde(rename = "response.text.delta")]
    TextDelta {
        delta: String,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Assistant turn complete
    #[serde(rename = "response.content.done")]
    ContentDone {
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Base64 chunk of synthesized audio
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        delta: String,
        #[serde(default)]
        item_id: Option<String>,
    },
}

/// API error information.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_update_serialization() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: vec!["text".to_string(), "audio".to_string()],
                instructions: Some("Collect the caller's email".to_string()),
                voice: "alloy".to_string(),
                input_audio_format: "g711_ulaw".to_string(),
                output_audio_format: "g711_ulaw".to_string(),
                turn_detection: TurnDetection::default(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"session.update""#));
        assert!(json.contains("g711_ulaw"));
        assert!(json.contains("server_vad"));
    }

    #[test]
    fn test_audio_append_passes_payload_through() {
        let event = ClientEvent::audio_append("cGF5bG9hZA==");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"input_audio_buffer.append""#));
        assert!(json.contains("cGF5bG9hZA=="));
    }

    #[test]
    fn test_speech_stopped_serialization() {
        let json = serde_json::to_string(&ClientEvent::InputAudioBufferSpeechStopped).unwrap();
        assert!(json.contains("input_audio_buffer.speech_stopped"));
    }

    #[test]
    fn test_input_text_append_serialization() {
        let event = ClientEvent::InputTextAppend {
            text: "Please continue naturally.".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"input_text.append""#));
    }

    #[test]
    fn test_text_delta_deserialization() {
        let json = r#"{"type": "response.text.delta", "delta": "Hel", "item_id": "item_1"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::TextDelta { delta, item_id } => {
                assert_eq!(delta, "Hel");
                assert_eq!(item_id.as_deref(), Some("item_1"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_content_done_deserialization() {
        let json = r#"{"type": "response.content.done"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ServerEvent::ContentDone { .. }));
    }

    #[test]
    fn test_audio_delta_deserialization() {
        let json = r#"{"type": "response.audio.delta", "delta": "AAECAw==", "item_id": "item_2"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::AudioDelta { delta, item_id } => {
                assert_eq!(delta, "AAECAw==");
                assert_eq!(item_id.as_deref(), Some("item_2"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_unknown_server_event_is_an_error() {
        let json = r#"{"type": "rate_limits.updated", "rate_limits": []}"#;
        assert!(serde_json::from_str::<ServerEvent>(json).is_err());
    }
}
