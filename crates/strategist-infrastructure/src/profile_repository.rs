//! File-backed ProfileRepository implementation.
//!
//! The user profile is a singleton, stored as one JSON file next to the
//! session directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use strategist_core::error::Result;
use strategist_core::preference::{MusicLeagueUserProfile, ProfileRepository};

use crate::paths::StrategistPaths;

pub struct FileProfileRepository {
    path: PathBuf,
}

impl FileProfileRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a repository at the default config location.
    pub fn default_location() -> Result<Self> {
        let path = StrategistPaths::profile_file()
            .map_err(|e| strategist_core::StrategistError::config(e.to_string()))?;
        Ok(Self::new(path))
    }
}

#[async_trait]
impl ProfileRepository for FileProfileRepository {
    async fn load(&self) -> Result<Option<MusicLeagueUserProfile>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path).await?;
        let profile: MusicLeagueUserProfile = serde_json::from_str(&json)?;
        Ok(Some(profile))
    }

    async fn save(&self, profile: &MusicLeagueUserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}
