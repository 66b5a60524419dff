//! Per-call session state.
//!
//! One [`CallSession`] exists per media-stream connection, owned exclusively
//! by that connection's bridge task. Every mutation happens inside the
//! bridge's select loop, so the two event sources (telephony, AI) are
//! serialized without locking.

use std::collections::VecDeque;

/// Lifecycle of one bridged call.
///
/// Driven by two independent event sources; once `Active`, events from
/// either side may arrive in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgeState {
    /// AI socket not yet open.
    Connecting,
    /// AI socket open, session not configured.
    Active,
    /// Session-configuration handshake sent.
    Ready,
    /// Media flowing.
    Streaming,
    /// One side signaled stop/close.
    Closing,
    /// Terminal; resources released.
    Closed,
}

/// Buffers and identifiers drained from a session at teardown.
#[derive(Debug)]
pub struct SessionArtifacts {
    pub stream_sid: Option<String>,
    pub customer: Option<String>,
    pub inbound_audio: Vec<u8>,
    pub outbound_audio: Vec<u8>,
    /// Whether any caller audio arrived at all, independent of whether the
    /// recording capability kept it.
    pub had_media: bool,
}

/// State for one active call.
#[derive(Debug)]
pub struct CallSession {
    state: BridgeState,
    /// Whether audio accumulators are kept (recording capability).
    record_audio: bool,

    stream_sid: Option<String>,
    /// Canonical customer phone number, when resolvable.
    customer: Option<String>,

    /// Offset (ms) of the most recent inbound chunk. Monotonically
    /// non-decreasing.
    latest_media_ts: u64,
    /// Inbound offset at the first audio delta of the current AI response.
    response_start_ts: Option<u64>,
    /// Most recent AI output item; would be needed for truncation on
    /// barge-in (not implemented).
    last_assistant_item: Option<String>,

    /// Playback-segment tokens awaiting provider acknowledgment.
    pending_marks: VecDeque<String>,

    /// Incremental text of the in-flight AI turn.
    response_text: String,

    inbound_audio: Vec<u8>,
    outbound_audio: Vec<u8>,
    had_media: bool,
}

impl CallSession {
    pub fn new(record_audio: bool) -> Self {
        Self {
            state: BridgeState::Connecting,
            record_audio,
            stream_sid: None,
            customer: None,
            latest_media_ts: 0,
            response_start_ts: None,
            last_assistant_item: None,
            pending_marks: VecDeque::new(),
            response_text: String::new(),
            inbound_audio: Vec::new(),
            outbound_audio: Vec::new(),
            had_media: false,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.as_deref()
    }

    pub fn customer(&self) -> Option<&str> {
        self.customer.as_deref()
    }

    pub fn latest_media_ts(&self) -> u64 {
        self.latest_media_ts
    }

    pub fn response_start_ts(&self) -> Option<u64> {
        self.response_start_ts
    }

    pub fn last_assistant_item(&self) -> Option<&str> {
        self.last_assistant_item.as_deref()
    }

    pub fn pending_mark_count(&self) -> usize {
        self.pending_marks.len()
    }

    pub fn is_streaming(&self) -> bool {
        self.state == BridgeState::Streaming
    }

    /// Advance the lifecycle, never backwards and never out of a terminal
    /// state. Tolerates events from either source arriving in any order.
    fn advance(&mut self, to: BridgeState) {
        if self.state >= BridgeState::Closing {
            return;
        }
        if to > self.state {
            self.state = to;
        }
    }

    /// AI socket opened.
    pub fn ai_open(&mut self) {
        self.advance(BridgeState::Active);
    }

    /// Session-configuration handshake sent.
    pub fn ai_ready(&mut self) {
        self.advance(BridgeState::Ready);
    }

    /// Telephony `start`: adopt the stream identity and reset all per-call
    /// accumulators.
    pub fn begin_stream(&mut self, stream_sid: String, customer: Option<String>) {
        self.stream_sid = Some(stream_sid);
        self.customer = customer;
        self.latest_media_ts = 0;
        self.response_start_ts = None;
        self.last_assistant_item = None;
        self.pending_marks.clear();
        self.response_text.clear();
        self.inbound_audio.clear();
        self.outbound_audio.clear();
        self.had_media = false;
        self.advance(BridgeState::Streaming);
    }

    /// Inbound audio chunk: bump the timestamp and accumulate.
    pub fn note_media(&mut self, timestamp: u64, ulaw: &[u8]) {
        self.latest_media_ts = self.latest_media_ts.max(timestamp);
        self.had_media = true;
        if self.record_audio {
            self.inbound_audio.extend_from_slice(ulaw);
        }
    }

    /// Outbound audio delta from the AI. Returns `true` when this is the
    /// first delta of the current response.
    pub fn note_audio_delta(&mut self, ulaw: &[u8], item_id: Option<String>) -> bool {
        if self.record_audio {
            self.outbound_audio.extend_from_slice(ulaw);
        }
        if let Some(item) = item_id {
            self.last_assistant_item = Some(item);
        }

        let first = self.response_start_ts.is_none();
        if first {
            self.response_start_ts = Some(self.latest_media_ts);
        }
        first
    }

    /// Queue one playback-mark token.
    pub fn push_mark(&mut self, name: String) {
        self.pending_marks.push_back(name);
    }

    /// Acknowledge one playback segment. `None` when the queue is empty,
    /// which is a no-op for callers.
    pub fn pop_mark(&mut self) -> Option<String> {
        self.pending_marks.pop_front()
    }

    /// Append an incremental text delta of the in-flight AI turn.
    pub fn append_text_delta(&mut self, delta: &str) {
        self.response_text.push_str(delta);
    }

    /// Take the completed turn's text, resetting the accumulator and the
    /// response-start offset for the next turn.
    pub fn take_turn_text(&mut self) -> String {
        self.response_start_ts = None;
        std::mem::take(&mut self.response_text)
    }

    /// One side signaled stop/close; no further media is accepted.
    pub fn begin_close(&mut self) {
        self.advance(BridgeState::Closing);
    }

    /// Tear the session down, draining buffers. Returns `None` on a second
    /// call so teardown side effects run exactly once.
    pub fn finish(&mut self) -> Option<SessionArtifacts> {
        if self.state == BridgeState::Closed {
            return None;
        }
        self.state = BridgeState::Closed;

        let artifacts = SessionArtifacts {
            stream_sid: self.stream_sid.take(),
            customer: self.customer.clone(),
            inbound_audio: std::mem::take(&mut self.inbound_audio),
            outbound_audio: std::mem::take(&mut self.outbound_audio),
            had_media: self.had_media,
        };

        self.pending_marks.clear();
        self.response_text.clear();
        self.had_media = false;
        Some(artifacts)
    }
}
