//! Call session bridge.
//!
//! Owns the lifecycle of one phone call's media stream: telephony events in,
//! AI audio/text back out, with side effects (persistence, silence
//! prompting, recording, post-call transcription) driven off event
//! transitions.
//!
//! One bridge task per media-stream connection runs a single select loop
//! over four sources: the telephony socket, the AI event channel, the
//! silence deadline, and the post-turn nudge deadline. All session state is
//! owned by that loop, which serializes the two event sources without
//! locking; outbound telephony frames go through a spawned sender task so
//! sends never block event handling.

pub mod session;
pub mod timer;

pub use session::{BridgeState, CallSession, SessionArtifacts};
pub use timer::ResetTimer;

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use base64::prelude::*;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::realtime::{AiEvent, ClientEvent, RealtimeClient, RealtimeConfig};
use crate::core::telephony::messages::{MediaPayload, StartPayload, StreamEvent, StreamMessage};
use crate::state::AppState;
use crate::store::LeadStatus;
use crate::utils::{canonicalize_phone, extract_email};

/// Outbound channel capacity toward the telephony socket.
const OUT_CHANNEL_CAPACITY: usize = 1024;

/// Placeholder conversation entry for caller speech; inbound audio is not
/// transcribed inline.
const USER_SPOKE_PLACEHOLDER: &str = "[caller audio]";

/// One-shot instruction sent when the silence window elapses.
const SILENCE_PROMPT: &str =
    "There's been a pause in the call. Briefly check in with the caller and keep things moving.";

/// Post-turn instruction so the conversation does not stall waiting for the
/// caller.
const NUDGE_PROMPT: &str = "Continue the conversation naturally.";

/// Run the bridge for one upgraded media-stream socket.
pub async fn run(socket: WebSocket, state: Arc<AppState>) {
    info!("Media stream connection established");
    let caps = state.config.bridge;

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<StreamMessage>(OUT_CHANNEL_CAPACITY);

    // Sender task: total order per destination, fire-and-forget for callers.
    let sender_task = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize stream message: {}", e);
                    continue;
                }
            };
            if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                warn!("Failed to send stream message: {}", e);
                break;
            }
        }
    });

    let realtime_config = RealtimeConfig {
        api_key: state.config.openai_api_key.clone(),
        model: state.config.realtime_model.clone(),
        voice: state.config.voice.clone(),
        instructions: Some(state.config.instructions.clone()),
        audio_output: !caps.tts_via_provider,
    };

    // A failed AI connection ends the session; the caller hears silence
    // rather than the bridge retrying.
    let (ai, mut ai_events) = match RealtimeClient::connect(&realtime_config).await {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to open AI connection: {}", e);
            sender_task.abort();
            return;
        }
    };

    let mut session = CallSession::new(caps.record_audio);
    session.ai_open();

    let mut silence = ResetTimer::new(state.config.silence_timeout);
    let mut nudge = ResetTimer::new(state.config.nudge_delay);

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<StreamEvent>(&text) {
                            Ok(StreamEvent::Start { start }) => {
                                on_start(&start, &mut session, &out_tx, &state).await;
                            }
                            Ok(StreamEvent::Media { media }) => {
                                on_media(&media, &mut session, &mut silence, &ai, &state).await;
                            }
                            Ok(StreamEvent::Mark { mark }) => {
                                match session.pop_mark() {
                                    Some(name) => debug!(sent = %name, acked = %mark.name, "Playback segment acknowledged"),
                                    None => debug!(acked = %mark.name, "Mark with empty queue, ignoring"),
                                }
                            }
                            Ok(StreamEvent::Stop { stop }) => {
                                let foreign = stop
                                    .as_ref()
                                    .and_then(|s| s.stream_sid.as_deref())
                                    .is_some_and(|sid| Some(sid) != session.stream_sid());
                                if foreign {
                                    debug!("Stop for unknown stream, ignoring");
                                    continue;
                                }
                                info!(stream_sid = ?session.stream_sid(), "Media stream stopped");
                                session.begin_close();
                                silence.disarm();
                                nudge.disarm();
                                finalize_session(&mut session, &state).await;
                                break;
                            }
                            Err(e) => {
                                // Malformed or unknown events never terminate
                                // the session.
                                warn!("Unhandled stream event: {} - {}", e, text);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Media stream closed by provider");
                        session.begin_close();
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Media stream error: {}", e);
                        break;
                    }
                }
            }

            ai_event = ai_events.recv() => {
                match ai_event {
                    Some(AiEvent::Ready) => {
                        debug!("AI session configured");
                        session.ai_ready();
                    }
                    Some(AiEvent::TextDelta { delta }) => {
                        session.append_text_delta(&delta);
                    }
                    Some(AiEvent::TurnComplete { item_id }) => {
                        on_turn_complete(item_id, &mut session, &mut nudge, &out_tx, &state).await;
                    }
                    Some(AiEvent::AudioDelta { payload, item_id }) => {
                        on_audio_delta(payload, item_id, &mut session, &out_tx).await;
                    }
                    Some(AiEvent::Closed) | None => {
                        // Terminal for this session; no reconnection.
                        warn!("AI connection ended, closing session");
                        session.begin_close();
                        break;
                    }
                }
            }

            _ = silence.wait() => {
                silence.disarm();
                debug!("Silence window elapsed, prompting a check-in");
                send_ai(&ai, ClientEvent::InputTextAppend { text: SILENCE_PROMPT.to_string() }).await;
            }

            _ = nudge.wait() => {
                nudge.disarm();
                send_ai(&ai, ClientEvent::InputTextAppend { text: NUDGE_PROMPT.to_string() }).await;
            }
        }
    }

    // Teardown, exactly once: release timers, close the counterpart
    // connection, finalize whatever the stop handler has not already.
    silence.disarm();
    nudge.disarm();
    ai.close();
    finalize_session(&mut session, &state).await;
    sender_task.abort();
    info!("Media stream session ended");
}

/// Telephony `start`: adopt the stream, resolve the customer, greet.
async fn on_start(
    start: &StartPayload,
    session: &mut CallSession,
    out_tx: &mpsc::Sender<StreamMessage>,
    state: &AppState,
) {
    let customer = start.customer_number().and_then(canonicalize_phone);
    if customer.is_none() {
        warn!(
            stream_sid = %start.stream_sid,
            raw = ?start.customer_number(),
            "No canonical customer number for this call"
        );
    }

    info!(
        stream_sid = %start.stream_sid,
        customer = ?customer,
        "Media stream started"
    );
    session.begin_stream(start.stream_sid.clone(), customer);

    // Immediate greeting before any AI turn, via provider-side synthesis.
    if let Some(greeting) = &state.config.greeting {
        send_stream(
            out_tx,
            StreamMessage::tts(&start.stream_sid, greeting.clone()),
        )
        .await;
    }
}

/// Telephony `media`: accumulate, forward to the AI, rearm the silence
/// window.
async fn on_media(
    media: &MediaPayload,
    session: &mut CallSession,
    silence: &mut ResetTimer,
    ai: &RealtimeClient,
    state: &AppState,
) {
    if !session.is_streaming() {
        debug!("Media for inactive stream, ignoring");
        return;
    }

    let ulaw = match BASE64_STANDARD.decode(&media.payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Malformed media payload: {} - {}", e, media.payload);
            return;
        }
    };

    session.note_media(media.timestamp, &ulaw);
    silence.rearm();

    if ai.is_open() {
        // Payload stays base64; the AI session is configured for the same
        // encoding the stream carries.
        send_ai(ai, ClientEvent::audio_append(&media.payload)).await;
    } else {
        debug!("AI connection not open, dropping audio chunk");
    }

    if media.utterance_end {
        send_ai(ai, ClientEvent::InputAudioBufferSpeechStopped).await;

        // Best effort: placeholder entry, inbound audio is not transcribed
        // inline.
        if let Some(customer) = session.customer() {
            if let Err(e) = state
                .store
                .append_conversation(customer, USER_SPOKE_PLACEHOLDER, false)
                .await
            {
                warn!("Failed to record caller turn: {}", e);
            }
        }
    }
}

/// AI turn complete: persist, extract email, synthesize, arm the nudge.
async fn on_turn_complete(
    item_id: Option<String>,
    session: &mut CallSession,
    nudge: &mut ResetTimer,
    out_tx: &mpsc::Sender<StreamMessage>,
    state: &AppState,
) {
    let text = session.take_turn_text();
    nudge.rearm();

    if text.is_empty() {
        debug!(item = ?item_id, "Turn completed with no text");
        return;
    }

    info!(
        item = ?item_id.as_deref().or(session.last_assistant_item()),
        chars = text.len(),
        "Assistant turn complete"
    );

    match session.customer() {
        Some(customer) => {
            if let Err(e) = state.store.append_conversation(customer, &text, true).await {
                warn!("Failed to persist assistant turn: {}", e);
            }
            if let Some(email) = extract_email(&text) {
                info!(customer, email, "Email captured from conversation");
                if let Err(e) = state.store.update_email(customer, email).await {
                    warn!("Failed to record email: {}", e);
                }
            }
        }
        None => {
            if extract_email(&text).is_some() {
                warn!("Email mentioned but the call has no customer number");
            }
        }
    }

    if state.config.bridge.tts_via_provider {
        if let Some(sid) = session.stream_sid() {
            let sid = sid.to_string();
            send_stream(out_tx, StreamMessage::tts(&sid, text)).await;
        }
    }
}

/// AI audio delta: relay to the caller and track playback with a mark.
async fn on_audio_delta(
    payload: String,
    item_id: Option<String>,
    session: &mut CallSession,
    out_tx: &mpsc::Sender<StreamMessage>,
) {
    let Some(sid) = session.stream_sid().map(str::to_string) else {
        debug!("Audio delta before stream start, dropping");
        return;
    };

    match BASE64_STANDARD.decode(&payload) {
        Ok(ulaw) => {
            if session.note_audio_delta(&ulaw, item_id) {
                debug!(
                    offset_ms = session.response_start_ts(),
                    "Response playback started"
                );
            }
        }
        Err(e) => {
            warn!("Malformed audio delta: {}", e);
            return;
        }
    }

    send_stream(out_tx, StreamMessage::media(&sid, payload)).await;

    let mark = uuid::Uuid::new_v4().to_string();
    session.push_mark(mark.clone());
    send_stream(out_tx, StreamMessage::mark(&sid, mark)).await;
}

/// Run the end-of-call side effects. Safe to call more than once; the
/// session yields its artifacts exactly once.
async fn finalize_session(session: &mut CallSession, state: &AppState) {
    let caps = state.config.bridge;
    let Some(artifacts) = session.finish() else {
        return;
    };

    let Some(stream_sid) = artifacts.stream_sid else {
        debug!("Session ended before any stream started");
        return;
    };

    if !artifacts.had_media {
        debug!(stream_sid = %stream_sid, "Call carried no media, nothing to finalize");
        return;
    }

    if caps.record_audio {
        match state.recorder.finalize(
            &stream_sid,
            &artifacts.inbound_audio,
            &artifacts.outbound_audio,
        ) {
            Ok(paths) => {
                if caps.transcribe_after_call {
                    if let Some(outbound) = paths.outbound {
                        match state.transcriber.transcribe_file(&outbound).await {
                            Ok(text) => info!(
                                stream_sid = %stream_sid,
                                chars = text.len(),
                                "Outbound track transcribed"
                            ),
                            Err(e) => error!("Post-call transcription failed: {}", e),
                        }
                    }
                }
            }
            Err(e) => error!("Failed to finalize recording: {}", e),
        }
    }

    if let Some(customer) = artifacts.customer {
        if let Err(e) = state
            .store
            .update_status(&customer, LeadStatus::CallCompleted)
            .await
        {
            warn!("Failed to update lead status: {}", e);
        }
    }
}

/// Queue a message toward the telephony socket. A closed channel means the
/// connection is gone; that is logged, never fatal here.
async fn send_stream(out_tx: &mpsc::Sender<StreamMessage>, message: StreamMessage) {
    if out_tx.send(message).await.is_err() {
        debug!("Telephony sender closed, dropping message");
    }
}

/// Queue an event toward the AI. Sending to a closed connection is a logged
/// no-op.
async fn send_ai(ai: &RealtimeClient, event: ClientEvent) {
    if let Err(e) = ai.send(event).await {
        debug!("AI send skipped: {}", e);
    }
}
