//! Preference domain models.

use serde::{Deserialize, Serialize};

/// How strongly a session preference statement was evidenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Lenient decode of the wire value; unknown strings land on `Medium`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }

    /// Initial long-term weight when a statement with this confidence is
    /// promoted.
    pub fn initial_weight(&self) -> f64 {
        match self {
            Confidence::High => 0.9,
            Confidence::Medium => 0.6,
            Confidence::Low => 0.3,
        }
    }
}

/// A song the user turned down during this session.
///
/// Once present, the (title, artist) pair must never be re-proposed; the
/// engine embeds the list in every prompt as an advisory constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedSong {
    pub title: String,
    pub artist: String,
    pub reason: String,
    pub timestamp: String,
}

/// A preference statement scoped to one session.
///
/// Created during a turn, never mutated, cleared only by session reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPreference {
    pub statement: String,
    pub confidence: Confidence,
    /// The user utterance that evidenced this preference.
    pub evidence: String,
    pub timestamp: String,
}

/// Whether a long-term preference is a broad taste or a narrow one.
///
/// General preferences outrank specific ones in any prioritized ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specificity {
    General,
    Specific,
}

/// A durable preference promoted from session preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermPreference {
    pub statement: String,
    pub specificity: Specificity,
    /// Weight in [0, 1]; ties within a specificity class break by weight
    /// descending.
    pub weight: f64,
    pub added_at: String,
    pub last_confirmed_at: String,
}

/// Singleton per-user profile, created lazily on the first promotion and
/// updated additively thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicLeagueUserProfile {
    pub summary: String,
    #[serde(default)]
    pub favorite_genres: Vec<String>,
    #[serde(default)]
    pub favorite_artists: Vec<String>,
    #[serde(default)]
    pub avoided: Vec<String>,
    #[serde(default)]
    pub long_term_preferences: Vec<LongTermPreference>,
    /// Count of promoted statements that were genuinely new.
    pub evidence_count: u32,
    /// Overall confidence in the profile, in [0, 1].
    pub confidence_weight: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl MusicLeagueUserProfile {
    pub fn new() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            summary: String::new(),
            favorite_genres: Vec::new(),
            favorite_artists: Vec::new(),
            avoided: Vec::new(),
            long_term_preferences: Vec::new(),
            evidence_count: 0,
            confidence_weight: 0.0,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl Default for MusicLeagueUserProfile {
    fn default() -> Self {
        Self::new()
    }
}
