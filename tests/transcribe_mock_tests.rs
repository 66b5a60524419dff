//! Post-call transcription tests against a mock API
//!
//! These tests verify:
//! - Multipart upload against the transcriptions endpoint, bearer auth
//! - JSON text extraction from the response
//! - Error statuses surface as rejections

use std::io::Write;

use leadline::core::transcribe::{TranscribeError, Transcriber};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_wav() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // Content is opaque to the client; any bytes will do for the mock.
    file.write_all(b"RIFF....WAVEfmt ").unwrap();
    file
}

#[tokio::test]
async fn test_transcribe_file_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "Thanks for calling, your email is on file."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transcriber = Transcriber::new("sk-test".to_string())
        .unwrap()
        .with_api_base(&server.uri());
    let wav = temp_wav();

    let text = transcriber.transcribe_file(wav.path()).await.unwrap();
    assert_eq!(text, "Thanks for calling, your email is on file.");
}

#[tokio::test]
async fn test_transcribe_file_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"error": "invalid api key"}"#),
        )
        .mount(&server)
        .await;

    let transcriber = Transcriber::new("sk-bad".to_string())
        .unwrap()
        .with_api_base(&server.uri());
    let wav = temp_wav();

    let result = transcriber.transcribe_file(wav.path()).await;
    match result {
        Err(TranscribeError::Rejected(msg)) => assert!(msg.contains("401")),
        other => panic!("Expected Rejected, got: {other:?}"),
    }
}
