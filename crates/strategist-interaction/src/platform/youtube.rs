//! YouTube Music playlist service.
//!
//! Same surface as the Spotify client with YouTube's semantics: video
//! search scoped to the music category, and playlist items inserted one by
//! one because the Data API has no batch add.

use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use async_trait::async_trait;
use strategist_core::config::{OAuthCredentials, SecretConfig};
use strategist_core::platform::Platform;
use strategist_infrastructure::SecretStorage;

use super::{CreatedPlaylist, PlatformError, PlatformStatus, PlaylistPlatform, TrackRef};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Music category id in the YouTube Data API.
const MUSIC_CATEGORY_ID: &str = "10";

const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Pause between playlist-item inserts to stay inside API quotas.
const ITEM_INSERT_DELAY: Duration = Duration::from_millis(250);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// YouTube Music implementation of [`PlaylistPlatform`].
pub struct YoutubeMusicPlatform {
    client: Client,
    credentials: Option<OAuthCredentials>,
    token: Mutex<Option<CachedToken>>,
}

impl YoutubeMusicPlatform {
    pub fn new(credentials: Option<OAuthCredentials>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Builds a client from secret.json, falling back to `YOUTUBE_CLIENT_ID`,
    /// `YOUTUBE_CLIENT_SECRET`, and `YOUTUBE_REFRESH_TOKEN` env vars.
    pub fn from_env() -> Self {
        if let Ok(storage) = SecretStorage::new() {
            if let Ok(SecretConfig {
                youtube: Some(credentials),
                ..
            }) = storage.load()
            {
                if credentials.is_complete() {
                    tracing::debug!("using YouTube credentials from secret.json");
                    return Self::new(Some(credentials));
                }
            }
        }

        let from_vars = (
            env::var("YOUTUBE_CLIENT_ID"),
            env::var("YOUTUBE_CLIENT_SECRET"),
            env::var("YOUTUBE_REFRESH_TOKEN"),
        );
        if let (Ok(client_id), Ok(client_secret), Ok(refresh_token)) = from_vars {
            tracing::debug!("using YouTube credentials from environment");
            return Self::new(Some(OAuthCredentials {
                client_id,
                client_secret,
                refresh_token,
            }));
        }

        Self::new(None)
    }

    fn credentials(&self) -> Result<&OAuthCredentials, PlatformError> {
        self.credentials
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or_else(|| {
                PlatformError::NotConfigured(
                    Platform::YoutubeMusic,
                    "missing client id, client secret, or refresh token".to_string(),
                )
            })
    }

    async fn access_token(&self) -> Result<String, PlatformError> {
        let credentials = self.credentials()?;

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|err| transport(format!("token exchange failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Auth(
                Platform::YoutubeMusic,
                format!("token exchange returned status {status}: {body}"),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| transport(format!("invalid token response: {err}")))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in)
                - TOKEN_EXPIRY_MARGIN,
        });

        Ok(access_token)
    }

    async fn insert_playlist_item(
        &self,
        access_token: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), PlatformError> {
        let response = self
            .client
            .post(format!("{API_BASE}/playlistItems"))
            .bearer_auth(access_token)
            .query(&[("part", "snippet")])
            .json(&serde_json::json!({
                "snippet": {
                    "playlistId": playlist_id,
                    "resourceId": {
                        "kind": "youtube#video",
                        "videoId": video_id,
                    },
                },
            }))
            .send()
            .await
            .map_err(|err| transport(format!("playlist item insert failed: {err}")))?;

        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PlaylistPlatform for YoutubeMusicPlatform {
    fn platform(&self) -> Platform {
        Platform::YoutubeMusic
    }

    async fn check_configuration(&self) -> PlatformStatus {
        match self.credentials() {
            Ok(_) => PlatformStatus::configured(),
            Err(err) => PlatformStatus::unconfigured(err.to_string()),
        }
    }

    async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<TrackRef>, PlatformError> {
        let access_token = self.access_token().await?;

        let query = format!("{title} {artist}");
        let response = self
            .client
            .get(format!("{API_BASE}/search"))
            .bearer_auth(&access_token)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", "1"),
                ("q", query.as_str()),
            ])
            .send()
            .await
            .map_err(|err| transport(format!("video search failed: {err}")))?;

        let response = check_status(response).await?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|err| transport(format!("invalid search response: {err}")))?;

        let track = body
            .items
            .into_iter()
            .find_map(|item| item.id.video_id)
            .map(|video_id| TrackRef {
                id: video_id,
                uri: None,
            });

        Ok(track)
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        tracks: &[TrackRef],
    ) -> Result<CreatedPlaylist, PlatformError> {
        let access_token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{API_BASE}/playlists"))
            .bearer_auth(&access_token)
            .query(&[("part", "snippet,status")])
            .json(&serde_json::json!({
                "snippet": {
                    "title": title,
                    "description": description,
                },
                "status": { "privacyStatus": "private" },
            }))
            .send()
            .await
            .map_err(|err| transport(format!("playlist creation failed: {err}")))?;

        let response = check_status(response).await?;
        let playlist: PlaylistResponse = response
            .json()
            .await
            .map_err(|err| transport(format!("invalid playlist response: {err}")))?;

        // no batch endpoint; insert sequentially to respect quotas
        for (index, track) in tracks.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(ITEM_INSERT_DELAY).await;
            }
            self.insert_playlist_item(&access_token, &playlist.id, &track.id)
                .await?;
        }

        Ok(CreatedPlaylist {
            playlist_url: format!("https://music.youtube.com/playlist?list={}", playlist.id),
            playlist_id: playlist.id,
        })
    }
}

fn transport(message: String) -> PlatformError {
    PlatformError::Transport(Platform::YoutubeMusic, message)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::Api(
        Platform::YoutubeMusic,
        status.as_u16(),
        body.chars().take(200).collect(),
    ))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_reports_status() {
        let client = YoutubeMusicPlatform::new(None);
        let status = client.check_configuration().await;
        assert!(!status.configured);
    }

    #[tokio::test]
    async fn test_complete_credentials_are_configured() {
        let client = YoutubeMusicPlatform::new(Some(OAuthCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "token".to_string(),
        }));
        assert!(client.check_configuration().await.configured);
    }
}
