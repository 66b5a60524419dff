//! Server configuration.
//!
//! Configuration is environment-variable driven (a `.env` file is loaded in
//! `main` before anything reads the environment). `ServerConfig::from_env()`
//! validates credentials up front so a misconfigured deployment fails at
//! startup, not on the first call.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default prompt used when `SYSTEM_INSTRUCTIONS` is not set.
const DEFAULT_INSTRUCTIONS: &str = "You are a friendly assistant on a phone call. Keep replies \
short and conversational. Your goal is to collect the caller's email address; once they give \
one, read it back to confirm and thank them.";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Which side effects the call bridge performs.
///
/// One bridge implementation, parameterized; deployments pick capabilities
/// via environment instead of shipping divergent handlers.
#[derive(Debug, Clone, Copy)]
pub struct BridgeCapabilities {
    /// Accumulate call audio and write WAV files on `stop`.
    pub record_audio: bool,
    /// After recording, transcribe the outbound track.
    pub transcribe_after_call: bool,
    /// Forward completed AI turns as `tts` events for provider-side speech
    /// synthesis instead of relaying the AI's own audio deltas.
    pub tts_via_provider: bool,
}

impl Default for BridgeCapabilities {
    fn default() -> Self {
        Self {
            record_audio: true,
            transcribe_after_call: true,
            tts_via_provider: false,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public base URL of this server (https), used to build the TwiML
    /// callback and the media-stream wss URL handed to the provider.
    pub public_url: String,

    // Persistence
    pub database_url: String,

    // AI settings
    pub openai_api_key: String,
    pub realtime_model: String,
    pub voice: String,
    pub instructions: String,
    /// Spoken to the caller as soon as the stream starts, before any AI turn.
    pub greeting: Option<String>,

    // Telephony settings
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,

    // Recording
    pub recordings_dir: PathBuf,

    // Bridge timing
    pub silence_timeout: Duration,
    pub nudge_delay: Duration,
    /// Pause between calls in a campaign dial loop.
    pub campaign_call_delay: Duration,

    // Security
    /// CORS allowed origins (comma-separated, or "*")
    pub cors_allowed_origins: Option<String>,

    pub bridge: BridgeCapabilities,
}

impl ServerConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port = parse_u16("PORT", std::env::var("PORT").ok(), 8080)?;

        Ok(Self {
            host,
            port,
            public_url: require("PUBLIC_URL")?,
            database_url: env_or("DATABASE_URL", "sqlite:leadline.db"),
            openai_api_key: require("OPENAI_API_KEY")?,
            realtime_model: env_or("REALTIME_MODEL", crate::core::realtime::config::DEFAULT_MODEL),
            voice: env_or("VOICE", crate::core::realtime::config::DEFAULT_VOICE),
            instructions: env_or("SYSTEM_INSTRUCTIONS", DEFAULT_INSTRUCTIONS),
            greeting: std::env::var("GREETING").ok().filter(|g| !g.is_empty()),
            twilio_account_sid: require("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: require("TWILIO_AUTH_TOKEN")?,
            twilio_from_number: require("TWILIO_FROM_NUMBER")?,
            recordings_dir: PathBuf::from(env_or("RECORDINGS_DIR", "recordings")),
            silence_timeout: Duration::from_secs(parse_u64(
                "SILENCE_TIMEOUT_SECS",
                std::env::var("SILENCE_TIMEOUT_SECS").ok(),
                10,
            )?),
            nudge_delay: Duration::from_secs(parse_u64(
                "NUDGE_DELAY_SECS",
                std::env::var("NUDGE_DELAY_SECS").ok(),
                3,
            )?),
            campaign_call_delay: Duration::from_secs(parse_u64(
                "CAMPAIGN_CALL_DELAY_SECS",
                std::env::var("CAMPAIGN_CALL_DELAY_SECS").ok(),
                5,
            )?),
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS").ok(),
            bridge: BridgeCapabilities {
                record_audio: parse_bool(
                    "BRIDGE_RECORD_AUDIO",
                    std::env::var("BRIDGE_RECORD_AUDIO").ok(),
                    true,
                )?,
                transcribe_after_call: parse_bool(
                    "BRIDGE_TRANSCRIBE_AFTER_CALL",
                    std::env::var("BRIDGE_TRANSCRIBE_AFTER_CALL").ok(),
                    true,
                )?,
                tts_via_provider: parse_bool(
                    "BRIDGE_TTS_VIA_PROVIDER",
                    std::env::var("BRIDGE_TTS_VIA_PROVIDER").ok(),
                    false,
                )?,
            },
        })
    }

    /// Bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The public wss URL of the media-stream endpoint.
    pub fn media_ws_url(&self) -> String {
        let base = self.public_url.trim_end_matches('/');
        let base = base
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{base}/media")
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_bool(
    name: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidVar {
                name,
                reason: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}

fn parse_u16(name: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            reason: format!("expected a number, got '{v}'"),
        }),
    }
}

fn parse_u64(name: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            reason: format!("expected a number, got '{v}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool("X", Some("true".to_string()), false).unwrap());
        assert!(parse_bool("X", Some("1".to_string()), false).unwrap());
        assert!(parse_bool("X", Some("YES".to_string()), false).unwrap());
        assert!(!parse_bool("X", Some("off".to_string()), true).unwrap());
        assert!(parse_bool("X", None, true).unwrap());
        assert!(!parse_bool("X", Some(String::new()), false).unwrap());
        assert!(parse_bool("X", Some("maybe".to_string()), false).is_err());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_u16("P", Some("9090".to_string()), 8080).unwrap(), 9090);
        assert_eq!(parse_u16("P", None, 8080).unwrap(), 8080);
        assert!(parse_u16("P", Some("not-a-port".to_string()), 8080).is_err());
        assert_eq!(parse_u64("S", Some(" 15 ".to_string()), 10).unwrap(), 15);
    }

    #[test]
    fn test_media_ws_url() {
        let mut config = test_config();
        config.public_url = "https://example.ngrok.app/".to_string();
        assert_eq!(config.media_ws_url(), "wss://example.ngrok.app/media");

        config.public_url = "http://localhost:8080".to_string();
        assert_eq!(config.media_ws_url(), "ws://localhost:8080/media");
    }

    #[test]
    fn test_default_capabilities() {
        let caps = BridgeCapabilities::default();
        assert!(caps.record_audio);
        assert!(caps.transcribe_after_call);
        assert!(!caps.tts_via_provider);
    }

    pub(crate) fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: "https://example.com".to_string(),
            database_url: "sqlite::memory:".to_string(),
            openai_api_key: "sk-test".to_string(),
            realtime_model: "gpt-4o-realtime-preview".to_string(),
            voice: "alloy".to_string(),
            instructions: "test instructions".to_string(),
            greeting: None,
            twilio_account_sid: "AC123".to_string(),
            twilio_auth_token: "token".to_string(),
            twilio_from_number: "+15550009999".to_string(),
            recordings_dir: PathBuf::from("recordings"),
            silence_timeout: Duration::from_secs(10),
            nudge_delay: Duration::from_secs(3),
            campaign_call_delay: Duration::from_secs(5),
            cors_allowed_origins: None,
            bridge: BridgeCapabilities::default(),
        }
    }
}
