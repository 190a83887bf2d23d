//! Session domain module.
//!
//! - `model`: the `MusicLeagueSession` aggregate and its pieces
//! - `message`: conversation transcript types
//! - `phase`: the phase state machine type
//! - `repository`: persistence trait for sessions

mod message;
mod model;
mod phase;
mod repository;

pub use message::{ConversationMessage, MessageRole};
pub use model::{MusicLeagueSession, PlaylistRecord, ThemeContext};
pub use phase::SessionPhase;
pub use repository::SessionRepository;
