//! Playlist platform services.
//!
//! Both platforms expose the same narrow surface: a configuration check, a
//! single-track search, and playlist creation. Everything else (OAuth token
//! exchange, user-id resolution, per-item inserts) stays inside the client.

pub mod spotify;
pub mod youtube;

use async_trait::async_trait;
use thiserror::Error;

use strategist_core::platform::Platform;

pub use spotify::SpotifyPlatform;
pub use youtube::YoutubeMusicPlatform;

/// A resolved external track reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    /// Platform-native id (Spotify track id, YouTube video id).
    pub id: String,
    /// Platform URI when the platform has one (e.g. `spotify:track:...`).
    pub uri: Option<String>,
}

/// Result of a successful playlist creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub playlist_id: String,
    pub playlist_url: String,
}

/// Outcome of a configuration check.
#[derive(Debug, Clone, Default)]
pub struct PlatformStatus {
    pub configured: bool,
    pub error: Option<String>,
}

impl PlatformStatus {
    pub fn configured() -> Self {
        Self {
            configured: true,
            error: None,
        }
    }

    pub fn unconfigured(error: impl Into<String>) -> Self {
        Self {
            configured: false,
            error: Some(error.into()),
        }
    }
}

/// Errors a platform client can surface.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{0} is not configured: {1}")]
    NotConfigured(Platform, String),

    #[error("{0} authentication failed: {1}")]
    Auth(Platform, String),

    #[error("{0} request failed: {1}")]
    Transport(Platform, String),

    #[error("{0} API error (status {1}): {2}")]
    Api(Platform, u16, String),
}

/// A playlist platform backend.
#[async_trait]
pub trait PlaylistPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    /// Cheap local credential check; never performs a network call.
    async fn check_configuration(&self) -> PlatformStatus;

    /// Looks up the best track match, or `None` when nothing matches.
    async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<TrackRef>, PlatformError>;

    /// Creates a playlist and adds the given tracks to it.
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        tracks: &[TrackRef],
    ) -> Result<CreatedPlaylist, PlatformError>;
}

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 300;
const FALLBACK_TITLE: &str = "Music League Picks";

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// First line only, special characters stripped, length-capped.
pub fn sanitize_playlist_title(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or("");
    let cleaned: String = first_line
        .chars()
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(c, '-' | '\'' | ',' | '.' | '!' | '?' | ':' | '(' | ')' | '&')
        })
        .collect();
    let title = truncate_chars(cleaned.trim(), MAX_TITLE_CHARS);
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title
    }
}

/// Newlines collapsed to spaces, length-capped.
pub fn sanitize_playlist_description(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&collapsed, MAX_DESCRIPTION_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_keeps_first_line_only() {
        let title = sanitize_playlist_title("Songs About Rain\nsecond line ignored");
        assert_eq!(title, "Songs About Rain");
    }

    #[test]
    fn test_title_strips_special_characters() {
        let title = sanitize_playlist_title("Rain <b>#1</b> {mixtape} \"vol. 2\"");
        assert!(!title.contains('<'));
        assert!(!title.contains('#'));
        assert!(!title.contains('{'));
        assert!(!title.contains('"'));
        assert!(title.contains("vol. 2"));
    }

    #[test]
    fn test_title_is_capped() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_playlist_title(&long).chars().count(), 100);
    }

    #[test]
    fn test_empty_title_falls_back() {
        assert_eq!(sanitize_playlist_title("###"), FALLBACK_TITLE);
        assert_eq!(sanitize_playlist_title(""), FALLBACK_TITLE);
    }

    #[test]
    fn test_description_collapses_newlines() {
        let description = sanitize_playlist_description("line one\nline two\r\n\nline three");
        assert_eq!(description, "line one line two line three");
    }

    #[test]
    fn test_description_is_capped() {
        let long = "word ".repeat(200);
        assert!(sanitize_playlist_description(&long).chars().count() <= 300);
    }
}
