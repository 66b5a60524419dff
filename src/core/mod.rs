pub mod audio;
pub mod bridge;
pub mod realtime;
pub mod telephony;
pub mod transcribe;

// Re-export commonly used types for convenience
pub use audio::{Recorder, RecordingPaths};
pub use bridge::{BridgeState, CallSession};
pub use realtime::{AiEvent, RealtimeClient, RealtimeConfig, RealtimeError};
pub use telephony::{Dialer, StreamEvent, StreamMessage, TelephonyError};
pub use transcribe::{TranscribeError, Transcriber};
