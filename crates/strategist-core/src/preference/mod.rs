//! Preference domain module.
//!
//! - `model`: rejected songs, session-scoped and long-term preferences, and
//!   the per-user profile they roll up into
//! - `ledger`: the bookkeeping rules (rejection matching, promotion dedup,
//!   prioritized ordering)
//! - `repository`: persistence trait for the user profile singleton

mod ledger;
mod model;
mod repository;

pub use ledger::{
    is_rejected, prioritized_long_term, promote_statements, record_rejection,
    record_session_preference,
};
pub use model::{
    Confidence, LongTermPreference, MusicLeagueUserProfile, RejectedSong, SessionPreference,
    Specificity,
};
pub use repository::ProfileRepository;
