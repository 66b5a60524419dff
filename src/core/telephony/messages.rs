//! Media-stream wire format.
//!
//! The telephony provider speaks JSON over the media-stream WebSocket,
//! discriminated by an `event` field. Inbound events scope to one call via
//! the stream SID assigned in `start`; outbound messages echo that SID so
//! the provider can route playback.
//!
//! Unknown event kinds deserialize as errors; callers log the raw frame and
//! keep going rather than tearing the session down.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound events (provider -> server)
// =============================================================================

/// Events received from the telephony media stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Stream opened; carries the stream SID and call metadata.
    Start { start: StartPayload },

    /// One chunk of caller audio (base64 G.711 mu-law, 8kHz).
    Media { media: MediaPayload },

    /// Playback acknowledgment for a previously sent mark token.
    Mark { mark: MarkPayload },

    /// Stream closed by the provider.
    Stop {
        #[serde(default)]
        stop: Option<StopPayload>,
    },
}

/// Payload of a `start` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub stream_sid: String,
    /// `<Parameter>` values from the TwiML that opened this stream.
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    /// Callee number, when the provider includes it.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
}

impl StartPayload {
    /// Resolve the customer phone number for this call.
    ///
    /// Custom parameters win (set by our own TwiML on dial-out); the
    /// provider-supplied callee number is the fallback for inbound calls.
    pub fn customer_number(&self) -> Option<&str> {
        self.custom_parameters
            .get("customer")
            .map(String::as_str)
            .or(self.to.as_deref())
    }
}

/// Payload of a `media` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// Offset of this chunk in milliseconds since stream start.
    #[serde(default, deserialize_with = "de_timestamp")]
    pub timestamp: u64,
    /// Base64-encoded mu-law audio.
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
    /// Set when the provider marks this chunk as the end of a caller
    /// utterance.
    #[serde(default)]
    pub utterance_end: bool,
}

/// The provider sends timestamps as JSON strings; accept numbers too.
fn de_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TsRepr {
        Num(u64),
        Str(String),
    }

    match TsRepr::deserialize(deserializer)? {
        TsRepr::Num(n) => Ok(n),
        TsRepr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Payload of a `mark` acknowledgment.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

/// Payload of a `stop` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPayload {
    #[serde(default)]
    pub stream_sid: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
}

// =============================================================================
// Outbound messages (server -> provider)
// =============================================================================

/// Messages sent back over the media stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum StreamMessage {
    /// Audio to play to the caller (base64 mu-law).
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Playback-segment token; echoed back by the provider as a `mark`
    /// event once the preceding audio has been played.
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: OutboundMark,
    },

    /// Plain text for provider-side speech synthesis. Used when the bridge
    /// runs with `tts_via_provider`, and always for the greeting.
    Tts {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        text: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMark {
    pub name: String,
}

impl StreamMessage {
    pub fn media(stream_sid: &str, payload: String) -> Self {
        StreamMessage::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia { payload },
        }
    }

    pub fn mark(stream_sid: &str, name: String) -> Self {
        StreamMessage::Mark {
            stream_sid: stream_sid.to_string(),
            mark: OutboundMark { name },
        }
    }

    pub fn tts(stream_sid: &str, text: String) -> Self {
        StreamMessage::Tts {
            stream_sid: stream_sid.to_string(),
            text,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_deserialization() {
        let json = r#"{
            "event": "start",
            "start": {
                "streamSid": "MZ0123",
                "callSid": "CA9876",
                "customParameters": {"customer": "+15551234567"}
            }
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Start { start } => {
                assert_eq!(start.stream_sid, "MZ0123");
                assert_eq!(start.customer_number(), Some("+15551234567"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_customer_falls_back_to_callee() {
        let json = r#"{
            "event": "start",
            "start": {"streamSid": "MZ1", "to": "+15550001111"}
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Start { start } => {
                assert_eq!(start.customer_number(), Some("+15550001111"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_media_event_with_string_timestamp() {
        let json = r#"{
            "event": "media",
            "media": {"timestamp": "1234", "payload": "AAAA", "track": "inbound"}
        }"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Media { media } => {
                assert_eq!(media.timestamp, 1234);
                assert_eq!(media.payload, "AAAA");
                assert!(!media.utterance_end);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_mark_and_stop_events() {
        let mark: StreamEvent =
            serde_json::from_str(r#"{"event": "mark", "mark": {"name": "seg-1"}}"#).unwrap();
        assert!(matches!(mark, StreamEvent::Mark { .. }));

        let stop: StreamEvent = serde_json::from_str(r#"{"event": "stop"}"#).unwrap();
        assert!(matches!(stop, StreamEvent::Stop { .. }));
    }

    #[test]
    fn test_unknown_event_kind_is_an_error() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"event": "dtmf", "digit": "5"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_outbound_media_serialization() {
        let msg = StreamMessage::media("MZ1", "b64audio".to_string());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""event":"media""#));
        assert!(json.contains(r#""streamSid":"MZ1""#));
        assert!(json.contains("b64audio"));
    }

    #[test]
    fn test_outbound_tts_serialization() {
        let msg = StreamMessage::tts("MZ1", "Hello there".to_string());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""event":"tts""#));
        assert!(json.contains("Hello there"));
    }
}
