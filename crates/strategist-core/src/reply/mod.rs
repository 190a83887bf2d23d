//! Structured reply recovered from raw chat-provider text.

mod payload;

pub use payload::{ExtractedPreference, ReplyAction, SongRejection, StrategistReply, parse_reply};
