//! Realtime API client.
//!
//! Owns one WebSocket to the AI for the lifetime of a call. The connection
//! runs in a spawned task that multiplexes outgoing [`ClientEvent`]s from an
//! mpsc command channel with incoming frames, translating server frames into
//! [`AiEvent`]s for the bridge. A failed or closed connection is terminal for
//! the session; there is no reconnection, the bridge tears the call down
//! instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};
use url::Url;

use super::config::RealtimeConfig;
use super::messages::{ClientEvent, ServerEvent, SessionConfig, TurnDetection};
use super::{RealtimeError, RealtimeResult};

/// Channel capacity for outgoing events.
const CMD_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for events surfaced to the bridge.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Delay before the session-configuration message is sent, so the provider
/// finishes its own session setup first.
const SESSION_SETUP_DELAY: Duration = Duration::from_millis(250);

/// Events surfaced to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum AiEvent {
    /// Session configuration has been sent; the connection is usable.
    Ready,
    /// Incremental assistant text.
    TextDelta { delta: String },
    /// The assistant finished a turn.
    TurnComplete { item_id: Option<String> },
    /// Base64 chunk of synthesized assistant audio.
    AudioDelta {
        payload: String,
        item_id: Option<String>,
    },
    /// The connection ended (close, error, or provider hangup). Terminal.
    Closed,
}

/// Handle to one realtime connection.
pub struct RealtimeClient {
    cmd_tx: mpsc::Sender<ClientEvent>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RealtimeClient {
    /// Connect and spawn the connection task.
    ///
    /// Returns the client handle plus the receiver the bridge selects on.
    pub async fn connect(
        config: &RealtimeConfig,
    ) -> RealtimeResult<(Self, mpsc::Receiver<AiEvent>)> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let ws_url = config.ws_url();
        let host = Url::parse(&ws_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| RealtimeError::ConnectionFailed(format!("invalid url: {ws_url}")))?;

        let request = http::Request::builder()
            .uri(&ws_url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(model = %config.model, "Connected to realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ClientEvent>(CMD_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<AiEvent>(EVENT_CHANNEL_CAPACITY);

        let connected = Arc::new(AtomicBool::new(true));
        let connected_task = connected.clone();
        let session_config = build_session_config(config);

        let task = tokio::spawn(async move {
            // Give the provider a moment to finish its own setup before the
            // session handshake; racing it loses the configuration.
            tokio::time::sleep(SESSION_SETUP_DELAY).await;

            let update = ClientEvent::SessionUpdate {
                session: session_config,
            };
            match serde_json::to_string(&update) {
                Ok(json) => {
                    if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                        error!("Failed to send session configuration: {}", e);
                        connected_task.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(AiEvent::Closed).await;
                        return;
                    }
                    let _ = event_tx.send(AiEvent::Ready).await;
                }
                Err(e) => {
                    error!("Failed to serialize session configuration: {}", e);
                    connected_task.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(AiEvent::Closed).await;
                    return;
                }
            }

            loop {
                tokio::select! {
                    outgoing = cmd_rx.recv() => {
                        let Some(event) = outgoing else {
                            // Handle dropped: intentional close.
                            debug!("Realtime command channel closed");
                            break;
                        };
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize client event: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send realtime event: {}", e);
                            break;
                        }
                    }

                    incoming = ws_stream.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        if let Some(ai_event) = translate(event) {
                                            if event_tx.send(ai_event).await.is_err() {
                                                break;
                                            }
                                        }
                                    }
                                    Err(e) => {
                                        // Unknown or malformed frames are logged with the
                                        // raw payload and skipped.
                                        warn!("Unhandled realtime frame: {} - {}", e, text);
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                info!("Realtime connection closed by provider");
                                break;
                            }
                            Some(Err(e)) => {
                                error!("Realtime WebSocket error: {}", e);
                                break;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
            }

            connected_task.store(false, Ordering::SeqCst);
            let _ = event_tx.send(AiEvent::Closed).await;
            debug!("Realtime connection task ended");
        });

        Ok((
            Self {
                cmd_tx,
                connected,
                task,
            },
            event_rx,
        ))
    }

    /// Whether the connection is still up.
    pub fn is_open(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue an event for sending. Fails with `NotConnected` once the
    /// connection has ended; callers log and continue.
    pub async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.cmd_tx
            .send(event)
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))
    }

    /// Tear the connection down. Idempotent.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Map a server frame to a bridge event. Frames with no bridge-side meaning
/// return `None` and are only logged.
fn translate(event: ServerEvent) -> Option<AiEvent> {
    match event {
        ServerEvent::TextDelta { delta, .. } => Some(AiEvent::TextDelta { delta }),
        ServerEvent::ContentDone { item_id } => Some(AiEvent::TurnComplete { item_id }),
        ServerEvent::AudioDelta { delta, item_id } => Some(AiEvent::AudioDelta {
            payload: delta,
            item_id,
        }),
        ServerEvent::SessionCreated { .. } => {
            debug!("Realtime session created");
            None
        }
        ServerEvent::Error { error } => {
            error!(
                "Realtime API error: {} - {}",
                error.error_type.as_deref().unwrap_or("unknown"),
                error.message.as_deref().unwrap_or("")
            );
            None
        }
    }
}

fn build_session_config(config: &RealtimeConfig) -> SessionConfig {
    SessionConfig {
        modalities: config.modalities(),
        instructions: config.instructions.clone(),
        voice: config.voice.clone(),
        input_audio_format: super::config::REALTIME_AUDIO_FORMAT.to_string(),
        output_audio_format: super::config::REALTIME_AUDIO_FORMAT.to_string(),
        turn_detection: TurnDetection::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_api_key() {
        let config = RealtimeConfig {
            api_key: String::new(),
            ..Default::default()
        };
        let result = RealtimeClient::connect(&config).await;
        assert!(matches!(
            result,
            Err(RealtimeError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_translate_text_delta() {
        let event = ServerEvent::TextDelta {
            delta: "Hi".to_string(),
            item_id: None,
        };
        assert_eq!(
            translate(event),
            Some(AiEvent::TextDelta {
                delta: "Hi".to_string()
            })
        );
    }

    #[test]
    fn test_translate_audio_delta_keeps_item_id() {
        let event = ServerEvent::AudioDelta {
            delta: "AAAA".to_string(),
            item_id: Some("item_7".to_string()),
        };
        match translate(event) {
            Some(AiEvent::AudioDelta { payload, item_id }) => {
                assert_eq!(payload, "AAAA");
                assert_eq!(item_id.as_deref(), Some("item_7"));
            }
            other => panic!("Unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn test_translate_session_created_is_silent() {
        let event = ServerEvent::SessionCreated { session: None };
        assert_eq!(translate(event), None);
    }

    #[test]
    fn test_session_config_from_realtime_config() {
        let config = RealtimeConfig {
            api_key: "sk-test".to_string(),
            instructions: Some("Collect an email".to_string()),
            ..Default::default()
        };
        let session = build_session_config(&config);
        assert_eq!(session.input_audio_format, "g711_ulaw");
        assert_eq!(session.output_audio_format, "g711_ulaw");
        assert_eq!(session.modalities, vec!["text", "audio"]);
        assert_eq!(session.instructions.as_deref(), Some("Collect an email"));
    }
}
