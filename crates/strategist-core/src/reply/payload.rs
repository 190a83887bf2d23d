//! Decoding of the reply payload the chat provider is instructed to emit.
//!
//! The provider has no enforced schema, so every field access goes through
//! an explicit type guard; absent or ill-typed fields simply decode to
//! nothing. The only hard requirement is that `json_repair` recovered an
//! object at all.

use serde_json::Value;

use crate::json_repair;
use crate::platform::Platform;
use crate::preference::Confidence;
use crate::song::{self, Song};

/// A phase- or side-effect-changing instruction carried by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAction {
    /// Copy the candidate list into the finalist list and flip the phase.
    EnterFinalists,
    /// Resolve and record the final pick; the session completes.
    FinalizePick,
    /// Create a playlist on the given platform, without a phase change.
    CreatePlaylist(Platform),
}

impl ReplyAction {
    /// Lenient decode of the wire action string.
    ///
    /// The provider is instructed to use a fixed set of snake_case strings,
    /// but camelCase and spaced spellings show up anyway. Unknown strings
    /// decode to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "enterfinalists" => Some(ReplyAction::EnterFinalists),
            "finalizepick" | "finalize" => Some(ReplyAction::FinalizePick),
            "createspotifyplaylist" | "createplaylistspotify" => {
                Some(ReplyAction::CreatePlaylist(Platform::Spotify))
            }
            "createyoutubeplaylist"
            | "createyoutubemusicplaylist"
            | "createplaylistyoutube"
            | "createplaylistyoutubemusic" => {
                Some(ReplyAction::CreatePlaylist(Platform::YoutubeMusic))
            }
            _ => {
                tracing::warn!(action = value, "ignoring unknown reply action");
                None
            }
        }
    }
}

/// A preference statement the strategist extracted from the user's turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPreference {
    pub statement: String,
    pub confidence: Confidence,
}

/// A song the reply asks to add to the rejected list.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRejection {
    pub title: String,
    pub artist: String,
    pub reason: String,
}

/// The structured reply shape the conversation engine consumes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategistReply {
    /// Candidate songs, already normalized. Empty when the reply carried
    /// none (or none survived normalization).
    pub candidates: Vec<Song>,
    /// Conversational text to show the user.
    pub message: Option<String>,
    /// Updated theme interpretation, if offered.
    pub interpretation: Option<String>,
    pub action: Option<ReplyAction>,
    pub extracted_preferences: Vec<ExtractedPreference>,
    pub songs_to_reject: Vec<SongRejection>,
}

fn string_guard(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(text) = value.get(*key).and_then(Value::as_str) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn array_guard<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_array))
}

fn decode_preferences(value: &Value) -> Vec<ExtractedPreference> {
    let Some(entries) = array_guard(value, &["extractedPreferences", "extracted_preferences"])
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let statement = string_guard(entry, &["statement", "preference"])?;
            let confidence = entry
                .get("confidence")
                .and_then(Value::as_str)
                .map(Confidence::parse_lenient)
                .unwrap_or(Confidence::Medium);
            Some(ExtractedPreference {
                statement,
                confidence,
            })
        })
        .collect()
}

fn decode_rejections(value: &Value) -> Vec<SongRejection> {
    let Some(entries) = array_guard(value, &["songsToReject", "songs_to_reject"]) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let title = string_guard(entry, &["title", "song"])?;
            let artist = string_guard(entry, &["artist", "band"])?;
            let reason =
                string_guard(entry, &["reason", "why"]).unwrap_or_else(|| "Rejected".to_string());
            Some(SongRejection {
                title,
                artist,
                reason,
            })
        })
        .collect()
}

impl StrategistReply {
    /// Decodes a reply from an already-parsed object value.
    pub fn from_value(value: &Value) -> Self {
        let candidates = match array_guard(value, &["candidates"]) {
            Some(records) => song::normalize_songs(records),
            // some replies put the list under "songs"/"tracks" instead
            None => song::parse_songs_payload(value),
        };

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .and_then(ReplyAction::parse);

        Self {
            candidates,
            message: string_guard(value, &["message", "reply"]),
            interpretation: string_guard(value, &["interpretation"]),
            action,
            extracted_preferences: decode_preferences(value),
            songs_to_reject: decode_rejections(value),
        }
    }
}

/// Recovers a structured reply from raw chat-provider text.
///
/// Returns `None` only when no object could be recovered at all; the engine
/// then falls back to showing the raw text.
pub fn parse_reply(raw: &str) -> Option<StrategistReply> {
    json_repair::parse_json_object(raw).map(|value| StrategistReply::from_value(&value))
}
