//! Session domain model.
//!
//! The `MusicLeagueSession` aggregate owns everything one themed round
//! accumulates: theme, candidates, finalists, rejections, preferences, the
//! transcript, and the eventual final pick. All mutation goes through the
//! conversation engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::{ConversationMessage, MessageRole};
use super::phase::SessionPhase;
use crate::platform::Platform;
use crate::preference::{RejectedSong, SessionPreference};
use crate::song::Song;

/// The round's theme as the user stated it, plus what the strategist made
/// of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeContext {
    /// Raw user-supplied theme text.
    pub raw_text: String,
    /// The strategist's reading of the theme, once it has offered one.
    #[serde(default)]
    pub interpretation: Option<String>,
    /// The strategic angle the user settled on, if any.
    #[serde(default)]
    pub angle: Option<String>,
}

impl ThemeContext {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            interpretation: None,
            angle: None,
        }
    }
}

/// Record of a playlist created for this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub platform: Platform,
    pub playlist_id: String,
    pub playlist_url: String,
    pub created_at: String,
}

/// Aggregate root for one Music League round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicLeagueSession {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub phase: SessionPhase,
    #[serde(default)]
    pub theme: Option<ThemeContext>,
    #[serde(default)]
    pub candidates: Vec<Song>,
    #[serde(default)]
    pub finalists: Vec<Song>,
    #[serde(default)]
    pub rejected: Vec<RejectedSong>,
    #[serde(default)]
    pub session_preferences: Vec<SessionPreference>,
    /// Append-only conversation history.
    #[serde(default)]
    pub transcript: Vec<ConversationMessage>,
    #[serde(default)]
    pub playlist: Option<PlaylistRecord>,
    /// Incremented once per completed turn.
    pub iterations: u32,
    #[serde(default)]
    pub final_pick: Option<Song>,
}

impl MusicLeagueSession {
    /// Creates an empty session in the `Conversation` phase.
    pub fn new() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now.clone(),
            updated_at: now,
            phase: SessionPhase::Conversation,
            theme: None,
            candidates: Vec::new(),
            finalists: Vec::new(),
            rejected: Vec::new(),
            session_preferences: Vec::new(),
            transcript: Vec::new(),
            playlist: None,
            iterations: 0,
            final_pick: None,
        }
    }

    /// Refreshes the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Appends a transcript entry and touches the session.
    pub fn append_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.transcript.push(ConversationMessage::now(role, content));
        self.touch();
    }

    /// Sets the theme from the given text unless one is already set.
    pub fn set_theme_if_unset(&mut self, raw_text: &str) {
        if self.theme.is_none() {
            self.theme = Some(ThemeContext::new(raw_text));
        }
    }

    /// True when no user message has been recorded yet.
    pub fn is_first_user_message(&self) -> bool {
        !self
            .transcript
            .iter()
            .any(|m| m.role == MessageRole::User)
    }

    /// The list a playlist should be built from: finalists once the session
    /// has narrowed down, candidates otherwise.
    pub fn playlist_candidates(&self) -> &[Song] {
        if self.finalists.is_empty() {
            &self.candidates
        } else {
            &self.finalists
        }
    }
}

impl Default for MusicLeagueSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = MusicLeagueSession::new();
        assert_eq!(session.phase, SessionPhase::Conversation);
        assert_eq!(session.iterations, 0);
        assert!(session.theme.is_none());
        assert!(session.is_first_user_message());
        assert!(!session.id.is_empty());
    }

    #[test]
    fn test_theme_set_once() {
        let mut session = MusicLeagueSession::new();
        session.set_theme_if_unset("songs about rain");
        session.set_theme_if_unset("songs about sun");
        assert_eq!(session.theme.unwrap().raw_text, "songs about rain");
    }

    #[test]
    fn test_append_message_updates_transcript() {
        let mut session = MusicLeagueSession::new();
        session.append_message(MessageRole::User, "hello");
        assert_eq!(session.transcript.len(), 1);
        assert!(!session.is_first_user_message());
    }
}
