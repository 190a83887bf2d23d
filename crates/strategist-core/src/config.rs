//! Application configuration models.
//!
//! Loading lives in the infrastructure layer; these are the shapes the rest
//! of the application consumes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CHAT_MODEL: &str = "claude-sonnet-4-20250514";

fn default_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

/// Non-secret application configuration (config.toml).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AppConfig {
    /// Chat model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature for chat completions.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Overrides the default session/profile storage directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            data_dir: None,
        }
    }
}

/// API key credentials for the chat provider.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChatCredentials {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// OAuth refresh-token credentials for a playlist platform.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl OAuthCredentials {
    /// True when every field is populated.
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty()
            && !self.client_secret.trim().is_empty()
            && !self.refresh_token.trim().is_empty()
    }
}

/// Secret configuration (secret.json): API keys and OAuth credentials.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub chat: Option<ChatCredentials>,
    #[serde(default)]
    pub spotify: Option<OAuthCredentials>,
    #[serde(default)]
    pub youtube: Option<OAuthCredentials>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.max_tokens, 4096);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_secret_config_partial_json() {
        let json = r#"{"chat": {"api_key": "sk-test"}}"#;
        let secrets: SecretConfig = serde_json::from_str(json).unwrap();
        assert_eq!(secrets.chat.unwrap().api_key, "sk-test");
        assert!(secrets.spotify.is_none());
    }

    #[test]
    fn test_oauth_completeness() {
        let creds = OAuthCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "".to_string(),
        };
        assert!(!creds.is_complete());
    }
}
