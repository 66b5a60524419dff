//! Realtime session configuration.

/// Audio format used on both legs of the AI connection.
///
/// The telephony media stream is G.711 mu-law at 8kHz; declaring the same
/// format to the AI lets base64 payloads pass through the bridge untouched
/// in both directions.
pub const REALTIME_AUDIO_FORMAT: &str = "g711_ulaw";

/// Default websocket endpoint of the realtime API.
pub const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

/// Default voice for AI audio output.
pub const DEFAULT_VOICE: &str = "alloy";

/// Configuration for one realtime connection.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use.
    pub model: String,
    /// Voice for audio output.
    pub voice: String,
    /// System instructions for the assistant.
    pub instructions: Option<String>,
    /// Whether the AI produces audio itself. When false (provider-side TTS
    /// deployments) only the text modality is requested.
    pub audio_output: bool,
}

impl RealtimeConfig {
    /// Build the websocket URL with the model query parameter.
    pub fn ws_url(&self) -> String {
        format!("{}?model={}", REALTIME_URL, self.model)
    }

    /// Requested response modalities.
    pub fn modalities(&self) -> Vec<String> {
        if self.audio_output {
            vec!["text".to_string(), "audio".to_string()]
        } else {
            vec!["text".to_string()]
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instructions: None,
            audio_output: true,
        }
    }
}
