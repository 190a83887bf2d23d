//! Chat-completion provider abstraction.
//!
//! The conversation engine only ever needs one thing from a provider: a
//! single non-streaming completion for an ordered message list, because the
//! structured reply is parsed from the complete text.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Role of a message sent to the chat provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    /// Ordered message list; system messages may appear anywhere and are
    /// hoisted by providers that take the system prompt out of band.
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

/// Errors a chat provider can surface.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Credentials are absent or unusable; no network call was made.
    #[error("Chat provider is not configured: {0}")]
    NotConfigured(String),

    /// Network failure or non-success response.
    #[error("Chat request failed: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
        retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The provider answered but carried no usable text.
    #[error("Chat provider returned an empty response")]
    EmptyResponse,
}

impl ChatError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Cheap local credential check, run before any state mutation.
    fn check_configuration(&self) -> Result<(), ChatError> {
        Ok(())
    }

    /// Requests one complete (non-streaming) completion.
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatError>;
}
