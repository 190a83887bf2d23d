//! Repository trait for the user-profile singleton.

use async_trait::async_trait;

use super::model::MusicLeagueUserProfile;
use crate::error::Result;

/// Persistence interface for the per-user profile.
///
/// There is exactly one profile per store; it is created lazily the first
/// time a long-term preference is promoted.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Loads the profile, or `None` when no promotion has happened yet.
    async fn load(&self) -> Result<Option<MusicLeagueUserProfile>>;

    /// Persists the profile, replacing the stored copy.
    async fn save(&self, profile: &MusicLeagueUserProfile) -> Result<()>;
}
