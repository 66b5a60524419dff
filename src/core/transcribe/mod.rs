//! Post-call transcription.
//!
//! Batch transcription of a finished recording through an audio
//! transcriptions REST endpoint (Whisper-style): multipart upload of the WAV
//! file, bearer auth, JSON `{"text": ...}` response.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Default API base for transcription requests.
const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Default transcription model.
const DEFAULT_MODEL: &str = "whisper-1";

/// Errors from transcription requests.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transcription rejected: {0}")]
    Rejected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Batch transcription client.
#[derive(Debug, Clone)]
pub struct Transcriber {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl Transcriber {
    pub fn new(api_key: String) -> Result<Self, TranscribeError> {
        let http = Client::builder()
            // Whisper can take a while on long recordings
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| TranscribeError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Override the API base (tests point this at a mock server).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Transcribe a finished audio file to text.
    pub async fn transcribe_file(&self, path: &Path) -> Result<String, TranscribeError> {
        let audio = tokio::fs::read(path).await?;
        let byte_count = audio.len();

        let file_part = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::Network(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .http
            .post(format!("{}/v1/audio/transcriptions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscribeError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscribeError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TranscribeError::Rejected(format!("{status}: {body}")));
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| TranscribeError::Network(e.to_string()))?;

        info!(
            file = %path.display(),
            bytes = byte_count,
            chars = parsed.text.len(),
            "Transcription complete"
        );
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let json = r#"{"text": "Hello world"}"#;
        let parsed: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text, "Hello world");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let transcriber = Transcriber::new("sk-test".to_string()).unwrap();
        let result = transcriber
            .transcribe_file(Path::new("/nonexistent/audio.wav"))
            .await;
        assert!(matches!(result, Err(TranscribeError::Io(_))));
    }
}
