//! Spotify playlist service.
//!
//! Uses the refresh-token OAuth flow: every API call chain first exchanges
//! the stored refresh token for a short-lived access token (cached until
//! shortly before expiry), and playlist creation additionally resolves the
//! current user id.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
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

const ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// How long before the reported expiry we stop trusting a cached token.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Spotify implementation of [`PlaylistPlatform`].
pub struct SpotifyPlatform {
    client: Client,
    credentials: Option<OAuthCredentials>,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyPlatform {
    pub fn new(credentials: Option<OAuthCredentials>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Builds a client from secret.json, falling back to `SPOTIFY_CLIENT_ID`,
    /// `SPOTIFY_CLIENT_SECRET`, and `SPOTIFY_REFRESH_TOKEN` env vars.
    ///
    /// Missing credentials produce an unconfigured client, not an error: the
    /// orchestrator degrades gracefully in that case.
    pub fn from_env() -> Self {
        if let Ok(storage) = SecretStorage::new() {
            if let Ok(SecretConfig {
                spotify: Some(credentials),
                ..
            }) = storage.load()
            {
                if credentials.is_complete() {
                    tracing::debug!("using Spotify credentials from secret.json");
                    return Self::new(Some(credentials));
                }
            }
        }

        let from_vars = (
            env::var("SPOTIFY_CLIENT_ID"),
            env::var("SPOTIFY_CLIENT_SECRET"),
            env::var("SPOTIFY_REFRESH_TOKEN"),
        );
        if let (Ok(client_id), Ok(client_secret), Ok(refresh_token)) = from_vars {
            tracing::debug!("using Spotify credentials from environment");
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
                    Platform::Spotify,
                    "missing client id, client secret, or refresh token".to_string(),
                )
            })
    }

    /// Exchanges the refresh token for an access token, with caching.
    async fn access_token(&self) -> Result<String, PlatformError> {
        let credentials = self.credentials()?;

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let basic = BASE64_STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ));

        let response = self
            .client
            .post(ACCOUNTS_URL)
            .header("Authorization", format!("Basic {basic}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|err| transport(format!("token exchange failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Auth(
                Platform::Spotify,
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

    /// Resolves the id of the user the refresh token belongs to.
    async fn current_user_id(&self, access_token: &str) -> Result<String, PlatformError> {
        let response = self
            .client
            .get(format!("{API_BASE}/me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| transport(format!("user lookup failed: {err}")))?;

        let response = check_status(response).await?;
        let user: UserResponse = response
            .json()
            .await
            .map_err(|err| transport(format!("invalid user response: {err}")))?;

        Ok(user.id)
    }
}

#[async_trait]
impl PlaylistPlatform for SpotifyPlatform {
    fn platform(&self) -> Platform {
        Platform::Spotify
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

        let query = format!("track:{title} artist:{artist}");
        let response = self
            .client
            .get(format!("{API_BASE}/search"))
            .bearer_auth(&access_token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .map_err(|err| transport(format!("track search failed: {err}")))?;

        let response = check_status(response).await?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|err| transport(format!("invalid search response: {err}")))?;

        let track = body
            .tracks
            .and_then(|t| t.items.into_iter().next())
            .map(|item| TrackRef {
                id: item.id,
                uri: Some(item.uri),
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
        let user_id = self.current_user_id(&access_token).await?;

        let response = self
            .client
            .post(format!("{API_BASE}/users/{user_id}/playlists"))
            .bearer_auth(&access_token)
            .json(&serde_json::json!({
                "name": title,
                "description": description,
                "public": false,
            }))
            .send()
            .await
            .map_err(|err| transport(format!("playlist creation failed: {err}")))?;

        let response = check_status(response).await?;
        let playlist: PlaylistResponse = response
            .json()
            .await
            .map_err(|err| transport(format!("invalid playlist response: {err}")))?;

        if !tracks.is_empty() {
            let uris: Vec<String> = tracks.iter().map(track_uri).collect();
            let response = self
                .client
                .post(format!("{API_BASE}/playlists/{}/tracks", playlist.id))
                .bearer_auth(&access_token)
                .json(&serde_json::json!({ "uris": uris }))
                .send()
                .await
                .map_err(|err| transport(format!("adding tracks failed: {err}")))?;
            check_status(response).await?;
        }

        let playlist_url = playlist
            .external_urls
            .and_then(|urls| urls.spotify)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id));

        Ok(CreatedPlaylist {
            playlist_id: playlist.id,
            playlist_url,
        })
    }
}

fn transport(message: String) -> PlatformError {
    PlatformError::Transport(Platform::Spotify, message)
}

fn track_uri(track: &TrackRef) -> String {
    track
        .uri
        .clone()
        .unwrap_or_else(|| format!("spotify:track:{}", track.id))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::Api(
        Platform::Spotify,
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
struct UserResponse {
    id: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Option<SearchTracks>,
}

#[derive(Deserialize)]
struct SearchTracks {
    items: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct TrackItem {
    id: String,
    uri: String,
}

#[derive(Deserialize)]
struct PlaylistResponse {
    id: String,
    external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_reports_status() {
        let client = SpotifyPlatform::new(None);
        let status = client.check_configuration().await;
        assert!(!status.configured);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_incomplete_credentials_are_unconfigured() {
        let client = SpotifyPlatform::new(Some(OAuthCredentials {
            client_id: "id".to_string(),
            client_secret: String::new(),
            refresh_token: "token".to_string(),
        }));
        assert!(!client.check_configuration().await.configured);
    }

    #[test]
    fn test_track_uri_falls_back_to_id() {
        let with_uri = TrackRef {
            id: "abc".to_string(),
            uri: Some("spotify:track:abc".to_string()),
        };
        let without_uri = TrackRef {
            id: "abc".to_string(),
            uri: None,
        };
        assert_eq!(track_uri(&with_uri), "spotify:track:abc");
        assert_eq!(track_uri(&without_uri), "spotify:track:abc");
    }
}
