//! Telephony provider integration.
//!
//! Three pieces: the media-stream wire format ([`messages`]), the REST
//! dial-out client ([`dialer`]), and the TwiML answer document ([`twiml`]).

pub mod dialer;
pub mod messages;
pub mod twiml;

pub use dialer::{Dialer, TelephonyError};
pub use messages::{StreamEvent, StreamMessage};
