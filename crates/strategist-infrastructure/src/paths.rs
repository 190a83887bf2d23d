//! Path resolution for everything the strategist stores on disk.
//!
//! Configuration, credentials, the taste profile, and session files all live
//! under one directory in the platform config location:
//!
//! ```text
//! ~/.config/strategist/
//! ├── config.toml      non-secret settings
//! ├── secret.json      API key and OAuth credentials, mode 600
//! ├── profile.json     long-term taste profile
//! └── sessions/        one JSON file per session
//! ```

use std::path::PathBuf;

use strategist_core::config::SecretConfig;

/// Path resolution failure.
#[derive(Debug)]
pub enum PathError {
    /// No home/config directory could be determined for this user.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct StrategistPaths;

impl StrategistPaths {
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("strategist"))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// The credentials file. Expected to be user-readable only.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("sessions"))
    }

    pub fn profile_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("profile.json"))
    }

    /// Creates `secret.json` from an empty template when it does not exist
    /// yet, so first-run users have a file to fill in. On Unix the file is
    /// written with mode 600.
    pub fn ensure_secret_file() -> Result<PathBuf, std::io::Error> {
        let secret_path = Self::secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;

        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::to_string_pretty(&SecretConfig::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&secret_path, template)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(secret_path)
    }
}
