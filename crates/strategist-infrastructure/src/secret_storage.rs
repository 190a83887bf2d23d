//! Credential loading from secret.json.
//!
//! The file is read-only from the application's point of view: it is written
//! once as a template (`StrategistPaths::ensure_secret_file`) and then edited
//! by the user. Values are stored as plain JSON, so the mode-600 permission
//! on the file is the only protection; nothing here validates keys against
//! the services they belong to.

use std::path::PathBuf;

use strategist_core::StrategistError;
use strategist_core::config::SecretConfig;

use crate::paths::StrategistPaths;

/// Reads `SecretConfig` out of the credentials file.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Points at secret.json in the default config directory.
    pub fn new() -> Result<Self, StrategistError> {
        let path = StrategistPaths::secret_file()
            .map_err(|e| StrategistError::config(e.to_string()))?;
        Ok(Self { path })
    }

    /// Points at an arbitrary file. Test seam.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Parses the file into `SecretConfig`.
    ///
    /// Error messages never contain secret values.
    pub fn load(&self) -> Result<SecretConfig, StrategistError> {
        if !self.path.exists() {
            return Err(StrategistError::not_found(
                "secret file",
                self.path.display().to_string(),
            ));
        }

        let json = std::fs::read_to_string(&self.path)?;
        let secrets: SecretConfig = serde_json::from_str(&json)?;
        Ok(secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_missing_file() {
        let storage = SecretStorage::with_path(PathBuf::from("/nonexistent/secret.json"));
        assert!(!storage.exists());
        assert!(storage.load().is_err());
    }

    #[test]
    fn test_load_parses_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"spotify": {{"client_id": "id", "client_secret": "s", "refresh_token": "r"}}}}"#
        )
        .unwrap();

        let storage = SecretStorage::with_path(file.path().to_path_buf());
        let secrets = storage.load().unwrap();
        assert!(secrets.chat.is_none());
        assert!(secrets.spotify.unwrap().is_complete());
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let storage = SecretStorage::with_path(file.path().to_path_buf());
        assert!(storage.load().is_err());
    }
}
