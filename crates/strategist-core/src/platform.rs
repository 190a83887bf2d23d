//! Target playlist platforms.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The playlist platforms the strategist can hand a finalized list to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Spotify,
    YoutubeMusic,
}

impl Platform {
    /// Human-facing platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::YoutubeMusic => "YouTube Music",
        }
    }

    /// Web search URL for a song on this platform's search surface.
    ///
    /// Used by the degraded playlist path when the platform integration is
    /// not configured.
    pub fn search_url(&self, title: &str, artist: &str) -> String {
        let query = urlencoding::encode(&format!("{} {}", title, artist)).into_owned();
        match self {
            Platform::Spotify => format!("https://open.spotify.com/search/{}", query),
            Platform::YoutubeMusic => {
                format!("https://music.youtube.com/search?q={}", query)
            }
        }
    }
}
