//! Repository trait for session persistence.

use async_trait::async_trait;

use super::model::MusicLeagueSession;
use crate::error::Result;

/// Persistence interface for sessions.
///
/// The conversation engine snapshots the in-memory session through this
/// trait after every mutation; persistence is asynchronous relative to the
/// in-memory update and only promises eventual durability.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads a session by id, or `None` when it does not exist.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<MusicLeagueSession>>;

    /// Persists a session, replacing any stored copy.
    async fn save(&self, session: &MusicLeagueSession) -> Result<()>;

    /// Deletes a session. Deleting a missing session is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all sessions, most recently updated first.
    async fn list_all(&self) -> Result<Vec<MusicLeagueSession>>;

    /// Returns the id of the active session, if one is tracked.
    async fn get_active_session_id(&self) -> Result<Option<String>>;

    /// Marks a session as active.
    async fn set_active_session_id(&self, session_id: &str) -> Result<()>;

    /// Clears the active-session marker.
    async fn clear_active_session_id(&self) -> Result<()>;
}
