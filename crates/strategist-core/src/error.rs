//! The shared error type.
//!
//! One structured enum covers every layer: storage, configuration, the chat
//! provider, and the playlist platforms. Variants carry enough context to be
//! shown to the user as-is; `From` impls keep `?` working against the common
//! library error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum StrategistError {
    /// A session, profile, or file that was asked for does not exist.
    #[error("{entity_type} not found: '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Filesystem failure while reading or writing application data.
    #[error("IO error: {message}")]
    Io { message: String },

    /// Repository-level failure that is not a plain IO error.
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// A persisted or wire value would not encode/decode.
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Missing or unusable configuration, caught before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat provider call failed (network or non-success response).
    #[error("Chat provider error: {message}")]
    Provider { message: String, retryable: bool },

    /// A playlist platform call failed (search, create, token exchange).
    #[error("Platform error ({platform}): {message}")]
    Platform { platform: String, message: String },

    /// The session already has a turn being processed.
    #[error("A turn is already being processed for session '{0}'")]
    TurnInFlight(String),

    /// Bug territory; not expected during normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StrategistError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        Self::Provider {
            message: message.into(),
            retryable,
        }
    }

    pub fn platform(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Platform {
            platform: platform.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

impl From<std::io::Error> for StrategistError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StrategistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for StrategistError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for StrategistError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for StrategistError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StrategistError>;
