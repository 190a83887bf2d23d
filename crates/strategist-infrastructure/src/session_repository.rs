//! Directory-backed SessionRepository implementation.
//!
//! One JSON file per session plus an `active_session.txt` marker:
//!
//! ```text
//! base_dir/
//! ├── sessions/
//! │   ├── <session-id-1>.json
//! │   └── <session-id-2>.json
//! └── active_session.txt
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use strategist_core::error::Result;
use strategist_core::session::{MusicLeagueSession, SessionRepository};

use crate::paths::StrategistPaths;

pub struct DirSessionRepository {
    base_dir: PathBuf,
}

impl DirSessionRepository {
    /// Creates a repository rooted at `base_dir`, creating the directory
    /// structure if needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("sessions")).await?;
        Ok(Self { base_dir })
    }

    /// Creates a repository at the default config location.
    pub async fn default_location() -> Result<Self> {
        let base_dir = StrategistPaths::config_dir()
            .map_err(|e| strategist_core::StrategistError::config(e.to_string()))?;
        Self::new(base_dir).await
    }

    fn session_file_path(&self, session_id: &str) -> PathBuf {
        self.base_dir
            .join("sessions")
            .join(format!("{}.json", session_id))
    }

    fn active_file_path(&self) -> PathBuf {
        self.base_dir.join("active_session.txt")
    }

    async fn load_from_path(&self, path: &Path) -> Result<MusicLeagueSession> {
        let json = fs::read_to_string(path).await?;
        let session: MusicLeagueSession = serde_json::from_str(&json)?;
        Ok(session)
    }
}

#[async_trait]
impl SessionRepository for DirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<MusicLeagueSession>> {
        let path = self.session_file_path(session_id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(self.load_from_path(&path).await?))
    }

    async fn save(&self, session: &MusicLeagueSession) -> Result<()> {
        let path = self.session_file_path(&session.id);
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&path, json).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.session_file_path(session_id);
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<MusicLeagueSession>> {
        let sessions_dir = self.base_dir.join("sessions");
        let mut sessions = Vec::new();

        let mut entries = fs::read_dir(&sessions_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match self.load_from_path(&path).await {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    // keep listing; one corrupt file should not hide the rest
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable session file");
                }
            }
        }

        // most recently updated first
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(sessions)
    }

    async fn get_active_session_id(&self) -> Result<Option<String>> {
        let path = self.active_file_path();
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let session_id = fs::read_to_string(&path).await?;
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Ok(None);
        }
        Ok(Some(session_id.to_string()))
    }

    async fn set_active_session_id(&self, session_id: &str) -> Result<()> {
        fs::write(self.active_file_path(), session_id).await?;
        Ok(())
    }

    async fn clear_active_session_id(&self) -> Result<()> {
        let path = self.active_file_path();
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategist_core::session::MessageRole;
    use tempfile::TempDir;

    fn create_test_session() -> MusicLeagueSession {
        let mut session = MusicLeagueSession::new();
        session.set_theme_if_unset("songs about rain");
        session.append_message(MessageRole::User, "songs about rain");
        session.append_message(MessageRole::Assistant, "Here are some ideas");
        session
    }

    #[tokio::test]
    async fn test_save_and_find_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DirSessionRepository::new(temp_dir.path()).await.unwrap();

        let session = create_test_session();
        repository.save(&session).await.unwrap();

        let loaded = repository.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_find_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DirSessionRepository::new(temp_dir.path()).await.unwrap();

        let result = repository.find_by_id("nonexistent-session").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_all_sorted_by_update_time() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DirSessionRepository::new(temp_dir.path()).await.unwrap();

        let mut first = MusicLeagueSession::new();
        first.updated_at = "2024-01-01T00:00:00Z".to_string();
        let mut second = MusicLeagueSession::new();
        second.updated_at = "2024-06-01T00:00:00Z".to_string();

        repository.save(&first).await.unwrap();
        repository.save(&second).await.unwrap();

        let sessions = repository.list_all().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second.id);
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DirSessionRepository::new(temp_dir.path()).await.unwrap();

        repository.save(&create_test_session()).await.unwrap();
        std::fs::write(
            temp_dir.path().join("sessions").join("broken.json"),
            "not json",
        )
        .unwrap();

        let sessions = repository.list_all().await.unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DirSessionRepository::new(temp_dir.path()).await.unwrap();

        let session = create_test_session();
        repository.save(&session).await.unwrap();
        assert!(repository.find_by_id(&session.id).await.unwrap().is_some());

        repository.delete(&session.id).await.unwrap();
        assert!(repository.find_by_id(&session.id).await.unwrap().is_none());

        // deleting again is not an error
        repository.delete(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_active_session_id() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DirSessionRepository::new(temp_dir.path()).await.unwrap();

        assert_eq!(repository.get_active_session_id().await.unwrap(), None);

        repository
            .set_active_session_id("active-session")
            .await
            .unwrap();
        assert_eq!(
            repository.get_active_session_id().await.unwrap(),
            Some("active-session".to_string())
        );

        repository.clear_active_session_id().await.unwrap();
        assert_eq!(repository.get_active_session_id().await.unwrap(), None);
    }
}
