//! Transcript entry types.

use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
///
/// `System` entries are audit notes (errors, degradations, lifecycle
/// events); they are shown to the user but never sent back to the chat
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One entry in a session's append-only transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

impl ConversationMessage {
    /// Builds an entry stamped with the current time.
    pub fn now(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
