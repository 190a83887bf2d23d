//! Song domain model.

use serde::{Deserialize, Serialize};

/// A candidate or finalist track in a Music League round.
///
/// Title and artist are guaranteed non-empty once a `Song` exists; records
/// that cannot satisfy that are dropped during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Free-text justification for proposing this song.
    pub reason: String,
    /// A probing question the strategist poses about this specific song.
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub eliminated: bool,
    /// External video reference (YouTube).
    #[serde(default)]
    pub video_id: Option<String>,
    /// External track reference (Spotify id or URI).
    #[serde(default)]
    pub track_ref: Option<String>,
}

impl Song {
    /// Case-insensitive, whitespace-trimmed title+artist comparison.
    pub fn matches(&self, title: &str, artist: &str) -> bool {
        normalized_pair(&self.title, &self.artist) == normalized_pair(title, artist)
    }

    /// Short "Title - Artist" label for logs and prompts.
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// The canonical form used for song identity comparisons.
pub fn normalized_pair(title: &str, artist: &str) -> (String, String) {
    (
        title.trim().to_lowercase(),
        artist.trim().to_lowercase(),
    )
}
