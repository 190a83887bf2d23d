//! Playlist creation orchestration.
//!
//! Given the session's finalized list and a target platform, resolve track
//! references and create a playlist - or, when the platform integration is
//! not configured, fall back to opening a search page per candidate. The
//! fallback is a designed outcome, never a failure.
//!
//! External calls are sequential with fixed delays; the platforms apply
//! per-caller rate limits, so there is no concurrent fan-out here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use strategist_core::error::Result;
use strategist_core::platform::Platform;
use strategist_core::session::{MessageRole, MusicLeagueSession, PlaylistRecord};
use strategist_core::song::Song;
use strategist_core::StrategistError;
use strategist_interaction::platform::{
    PlaylistPlatform, TrackRef, sanitize_playlist_description, sanitize_playlist_title,
};

/// Delay between consecutive track lookups.
const SEARCH_DELAY: Duration = Duration::from_millis(350);

/// Delay between fallback tab opens, so browsers don't flag a popup storm.
const TAB_STAGGER_DELAY: Duration = Duration::from_millis(500);

/// Opens a URL on the user's browsing surface.
///
/// The presentation layer decides what "open" means; tests capture the URLs.
#[async_trait]
pub trait TabOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<()>;
}

/// A `TabOpener` that only logs the URL. Used by headless surfaces.
pub struct LoggingTabOpener;

#[async_trait]
impl TabOpener for LoggingTabOpener {
    async fn open(&self, url: &str) -> Result<()> {
        tracing::info!(url, "open this search page to continue by hand");
        Ok(())
    }
}

/// What a playlist-creation request ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistOutcome {
    /// A playlist was created and recorded on the session.
    Created(PlaylistRecord),
    /// The platform is unconfigured; search pages were opened instead.
    Degraded { search_urls: Vec<String> },
    /// The session had no candidates to work with.
    NoCandidates,
}

pub struct PlaylistOrchestrator {
    platforms: HashMap<Platform, Arc<dyn PlaylistPlatform>>,
    opener: Arc<dyn TabOpener>,
    search_delay: Duration,
    stagger_delay: Duration,
}

impl PlaylistOrchestrator {
    pub fn new(platforms: Vec<Arc<dyn PlaylistPlatform>>, opener: Arc<dyn TabOpener>) -> Self {
        Self {
            platforms: platforms
                .into_iter()
                .map(|p| (p.platform(), p))
                .collect(),
            opener,
            search_delay: SEARCH_DELAY,
            stagger_delay: TAB_STAGGER_DELAY,
        }
    }

    /// Overrides the fixed delays (tests run with zero).
    pub fn with_delays(mut self, search_delay: Duration, stagger_delay: Duration) -> Self {
        self.search_delay = search_delay;
        self.stagger_delay = stagger_delay;
        self
    }

    /// Creates a playlist from the session's current list on the given
    /// platform, degrading to search tabs when the platform is unconfigured.
    ///
    /// On success the playlist record lands on the session along with a
    /// celebratory transcript entry.
    pub async fn create_playlist(
        &self,
        platform: Platform,
        session: &mut MusicLeagueSession,
    ) -> Result<PlaylistOutcome> {
        let candidates: Vec<Song> = session.playlist_candidates().to_vec();
        if candidates.is_empty() {
            session.append_message(
                MessageRole::System,
                format!(
                    "No candidates to put on a {} playlist yet.",
                    platform.display_name()
                ),
            );
            return Ok(PlaylistOutcome::NoCandidates);
        }

        let service = match self.platforms.get(&platform) {
            Some(service) => service,
            None => return self.degrade(platform, &candidates, session).await,
        };

        let status = service.check_configuration().await;
        if !status.configured {
            tracing::info!(
                platform = %platform,
                error = status.error.as_deref().unwrap_or("no credentials"),
                "platform unconfigured, using search-tab fallback"
            );
            return self.degrade(platform, &candidates, session).await;
        }

        let mut resolved = Vec::new();
        let mut skipped = Vec::new();
        let mut looked_up = false;
        for song in &candidates {
            if let Some(track) = preresolved_ref(platform, song) {
                resolved.push(track);
                continue;
            }
            if looked_up {
                tokio::time::sleep(self.search_delay).await;
            }
            looked_up = true;
            match service.search_track(&song.title, &song.artist).await {
                Ok(Some(track)) => resolved.push(track),
                Ok(None) => {
                    tracing::warn!(song = %song.label(), "no track match, skipping");
                    skipped.push(song.label());
                }
                Err(err) => {
                    tracing::warn!(song = %song.label(), %err, "track lookup failed, skipping");
                    skipped.push(song.label());
                }
            }
        }

        let theme_text = session
            .theme
            .as_ref()
            .map(|t| t.raw_text.clone())
            .unwrap_or_else(|| "Music League".to_string());
        let title = sanitize_playlist_title(&format!("Music League: {}", theme_text));
        let description = sanitize_playlist_description(&format!(
            "Candidates for the \"{}\" round, picked with a little help.",
            theme_text
        ));

        let created = service
            .create_playlist(&title, &description, &resolved)
            .await
            .map_err(|err| StrategistError::platform(platform.to_string(), err.to_string()))?;

        let record = PlaylistRecord {
            platform,
            playlist_id: created.playlist_id,
            playlist_url: created.playlist_url,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        session.playlist = Some(record.clone());

        let mut celebration = format!(
            "Your {} playlist is live with {} track{}! {}",
            platform.display_name(),
            resolved.len(),
            if resolved.len() == 1 { "" } else { "s" },
            record.playlist_url
        );
        if !skipped.is_empty() {
            celebration.push_str(&format!(
                " (Couldn't find: {}.)",
                skipped.join(", ")
            ));
        }
        session.append_message(MessageRole::Assistant, celebration);

        Ok(PlaylistOutcome::Created(record))
    }

    async fn degrade(
        &self,
        platform: Platform,
        candidates: &[Song],
        session: &mut MusicLeagueSession,
    ) -> Result<PlaylistOutcome> {
        let search_urls: Vec<String> = candidates
            .iter()
            .map(|song| platform.search_url(&song.title, &song.artist))
            .collect();

        for (index, url) in search_urls.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.stagger_delay).await;
            }
            if let Err(err) = self.opener.open(url).await {
                // the fallback itself must never become a hard failure
                tracing::warn!(%err, url, "failed to open search tab");
            }
        }

        session.append_message(
            MessageRole::System,
            format!(
                "{} integration is not configured, so no playlist was created. Opened {} search \
                 page{} as a fallback so the playlist can be built by hand.",
                platform.display_name(),
                search_urls.len(),
                if search_urls.len() == 1 { "" } else { "s" }
            ),
        );

        Ok(PlaylistOutcome::Degraded { search_urls })
    }
}

/// Track reference already carried by the song, when it fits the platform.
fn preresolved_ref(platform: Platform, song: &Song) -> Option<TrackRef> {
    match platform {
        Platform::Spotify => song.track_ref.as_ref().map(|reference| {
            if let Some(id) = reference.strip_prefix("spotify:track:") {
                TrackRef {
                    id: id.to_string(),
                    uri: Some(reference.clone()),
                }
            } else {
                TrackRef {
                    id: reference.clone(),
                    uri: None,
                }
            }
        }),
        Platform::YoutubeMusic => song.video_id.as_ref().map(|id| TrackRef {
            id: id.clone(),
            uri: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use strategist_interaction::platform::{
        CreatedPlaylist, PlatformError, PlatformStatus,
    };

    struct CapturingOpener {
        urls: Mutex<Vec<String>>,
    }

    impl CapturingOpener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TabOpener for CapturingOpener {
        async fn open(&self, url: &str) -> Result<()> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct FakePlatform {
        platform: Platform,
        configured: bool,
        /// titles that resolve; everything else returns no match
        known_titles: Vec<String>,
        create_calls: Mutex<Vec<(String, String, usize)>>,
        fail_create: bool,
    }

    impl FakePlatform {
        fn configured(known_titles: &[&str]) -> Self {
            Self {
                platform: Platform::Spotify,
                configured: true,
                known_titles: known_titles.iter().map(|s| s.to_string()).collect(),
                create_calls: Mutex::new(Vec::new()),
                fail_create: false,
            }
        }

        fn unconfigured() -> Self {
            Self {
                platform: Platform::Spotify,
                configured: false,
                known_titles: Vec::new(),
                create_calls: Mutex::new(Vec::new()),
                fail_create: false,
            }
        }
    }

    #[async_trait]
    impl PlaylistPlatform for FakePlatform {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn check_configuration(&self) -> PlatformStatus {
            if self.configured {
                PlatformStatus::configured()
            } else {
                PlatformStatus::unconfigured("no credentials")
            }
        }

        async fn search_track(
            &self,
            title: &str,
            _artist: &str,
        ) -> std::result::Result<Option<TrackRef>, PlatformError> {
            Ok(self
                .known_titles
                .iter()
                .any(|known| known == title)
                .then(|| TrackRef {
                    id: format!("id-{title}"),
                    uri: Some(format!("spotify:track:id-{title}")),
                }))
        }

        async fn create_playlist(
            &self,
            title: &str,
            description: &str,
            tracks: &[TrackRef],
        ) -> std::result::Result<CreatedPlaylist, PlatformError> {
            if self.fail_create {
                return Err(PlatformError::Api(
                    self.platform,
                    500,
                    "boom".to_string(),
                ));
            }
            self.create_calls.lock().unwrap().push((
                title.to_string(),
                description.to_string(),
                tracks.len(),
            ));
            Ok(CreatedPlaylist {
                playlist_id: "pl-1".to_string(),
                playlist_url: "https://open.spotify.com/playlist/pl-1".to_string(),
            })
        }
    }

    fn song(title: &str, artist: &str) -> Song {
        Song {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: None,
            year: None,
            genre: None,
            reason: "fits".to_string(),
            question: None,
            favorite: false,
            eliminated: false,
            video_id: None,
            track_ref: None,
        }
    }

    fn zero_delay(
        platforms: Vec<Arc<dyn PlaylistPlatform>>,
        opener: Arc<dyn TabOpener>,
    ) -> PlaylistOrchestrator {
        PlaylistOrchestrator::new(platforms, opener)
            .with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_unconfigured_platform_degrades() {
        let platform = Arc::new(FakePlatform::unconfigured());
        let opener = CapturingOpener::new();
        let orchestrator =
            zero_delay(vec![platform.clone() as Arc<dyn PlaylistPlatform>], opener.clone());

        let mut session = MusicLeagueSession::new();
        session.candidates.push(song("Blue Monday", "New Order"));
        session.candidates.push(song("Yellow", "Coldplay"));

        let outcome = orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await
            .unwrap();

        match outcome {
            PlaylistOutcome::Degraded { search_urls } => assert_eq!(search_urls.len(), 2),
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        // no external create call happened
        assert!(platform.create_calls.lock().unwrap().is_empty());
        // both tabs were opened
        assert_eq!(opener.urls.lock().unwrap().len(), 2);
        // and the transcript records the fallback
        let note = session.transcript.last().unwrap();
        assert_eq!(note.role, MessageRole::System);
        assert!(note.content.contains("not configured"));
        assert!(session.playlist.is_none());
    }

    #[tokio::test]
    async fn test_unknown_platform_degrades_too() {
        let opener = CapturingOpener::new();
        let orchestrator = zero_delay(vec![], opener.clone());

        let mut session = MusicLeagueSession::new();
        session.candidates.push(song("Blue Monday", "New Order"));

        let outcome = orchestrator
            .create_playlist(Platform::YoutubeMusic, &mut session)
            .await
            .unwrap();

        assert!(matches!(outcome, PlaylistOutcome::Degraded { .. }));
        assert_eq!(opener.urls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_configured_platform_creates_and_records() {
        let platform = Arc::new(FakePlatform::configured(&["Blue Monday", "Yellow"]));
        let orchestrator = zero_delay(
            vec![platform.clone() as Arc<dyn PlaylistPlatform>],
            CapturingOpener::new(),
        );

        let mut session = MusicLeagueSession::new();
        session.set_theme_if_unset("songs about colors\nwith a second line");
        session.candidates.push(song("Blue Monday", "New Order"));
        session.candidates.push(song("Yellow", "Coldplay"));

        let outcome = orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await
            .unwrap();

        let record = match outcome {
            PlaylistOutcome::Created(record) => record,
            other => panic!("expected created outcome, got {other:?}"),
        };
        assert_eq!(record.playlist_id, "pl-1");
        assert_eq!(session.playlist.as_ref().unwrap().playlist_id, "pl-1");

        let calls = platform.create_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (title, _description, track_count) = &calls[0];
        // title comes from the theme's first line only
        assert_eq!(title, "Music League: songs about colors");
        assert_eq!(*track_count, 2);

        let last = session.transcript.last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.content.contains("open.spotify.com"));
    }

    #[tokio::test]
    async fn test_unresolved_candidates_are_skipped_not_fatal() {
        let platform = Arc::new(FakePlatform::configured(&["Blue Monday"]));
        let orchestrator = zero_delay(
            vec![platform.clone() as Arc<dyn PlaylistPlatform>],
            CapturingOpener::new(),
        );

        let mut session = MusicLeagueSession::new();
        session.candidates.push(song("Blue Monday", "New Order"));
        session.candidates.push(song("Obscure B-side", "Nobody"));

        let outcome = orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await
            .unwrap();

        assert!(matches!(outcome, PlaylistOutcome::Created(_)));
        let calls = platform.create_calls.lock().unwrap();
        assert_eq!(calls[0].2, 1);
        let last = session.transcript.last().unwrap();
        assert!(last.content.contains("Obscure B-side"));
    }

    #[tokio::test]
    async fn test_preresolved_refs_skip_search() {
        let platform = Arc::new(FakePlatform::configured(&[]));
        let orchestrator = zero_delay(
            vec![platform.clone() as Arc<dyn PlaylistPlatform>],
            CapturingOpener::new(),
        );

        let mut session = MusicLeagueSession::new();
        let mut resolved_song = song("Blue Monday", "New Order");
        resolved_song.track_ref = Some("spotify:track:abc123".to_string());
        session.candidates.push(resolved_song);

        let outcome = orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await
            .unwrap();

        assert!(matches!(outcome, PlaylistOutcome::Created(_)));
        // search knows no titles, so the track must have come from the song
        assert_eq!(platform.create_calls.lock().unwrap()[0].2, 1);
    }

    #[tokio::test]
    async fn test_create_failure_surfaces_error() {
        let mut failing = FakePlatform::configured(&["Blue Monday"]);
        failing.fail_create = true;
        let orchestrator = zero_delay(
            vec![Arc::new(failing) as Arc<dyn PlaylistPlatform>],
            CapturingOpener::new(),
        );

        let mut session = MusicLeagueSession::new();
        session.candidates.push(song("Blue Monday", "New Order"));

        let result = orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await;

        assert!(result.is_err());
        assert!(session.playlist.is_none());
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let orchestrator = zero_delay(vec![], CapturingOpener::new());
        let mut session = MusicLeagueSession::new();

        let outcome = orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await
            .unwrap();

        assert_eq!(outcome, PlaylistOutcome::NoCandidates);
    }

    #[tokio::test]
    async fn test_finalists_take_precedence() {
        let platform = Arc::new(FakePlatform::unconfigured());
        let opener = CapturingOpener::new();
        let orchestrator = zero_delay(vec![platform as Arc<dyn PlaylistPlatform>], opener.clone());

        let mut session = MusicLeagueSession::new();
        session.candidates.push(song("Candidate", "A"));
        session.candidates.push(song("Another", "B"));
        session.finalists.push(song("Finalist", "C"));

        orchestrator
            .create_playlist(Platform::Spotify, &mut session)
            .await
            .unwrap();

        let urls = opener.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("Finalist"));
    }
}
