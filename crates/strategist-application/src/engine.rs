//! Conversation engine: session lifecycle and the per-turn state machine.
//!
//! The engine owns every session mutation. Each turn follows the same path:
//! local guards, append the user message, build a phase-appropriate system
//! prompt from session state, one non-streaming chat completion, recover a
//! structured reply from the raw text, apply its mutations, and snapshot the
//! session to the repository. A per-session in-flight flag (released by an
//! RAII guard on every exit path) keeps turns from overlapping.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

use strategist_core::config::AppConfig;
use strategist_core::preference::{
    Confidence, ProfileRepository, promote_statements, record_rejection,
    record_session_preference,
};
use strategist_core::reply::{self, ReplyAction, StrategistReply};
use strategist_core::session::{
    MessageRole, MusicLeagueSession, SessionPhase, SessionRepository,
};
use strategist_core::song::Song;
use strategist_core::{Result, StrategistError};
use strategist_interaction::chat::{ChatMessage, ChatProvider, ChatRequest};

use crate::playlist::{PlaylistOrchestrator, PlaylistOutcome};
use crate::prompt;

/// What a processed turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Assistant text for this turn: the reply's message, or the raw
    /// provider text when no structured reply could be recovered.
    pub assistant_text: String,
    /// Whether a structured reply was recovered.
    pub recovered: bool,
    /// Snapshot of the session after the turn.
    pub session: MusicLeagueSession,
    /// Set when the turn triggered playlist creation.
    pub playlist_outcome: Option<PlaylistOutcome>,
}

/// Releases the per-session in-flight flag on every exit path.
struct TurnGuard<'a> {
    flags: &'a Mutex<HashSet<String>>,
    session_id: String,
}

impl<'a> TurnGuard<'a> {
    fn acquire(flags: &'a Mutex<HashSet<String>>, session_id: &str) -> Result<Self> {
        let mut in_flight = flags.lock().unwrap();
        if !in_flight.insert(session_id.to_string()) {
            return Err(StrategistError::TurnInFlight(session_id.to_string()));
        }
        Ok(Self {
            flags,
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.flags.lock().unwrap().remove(&self.session_id);
    }
}

pub struct ConversationEngine {
    /// In-memory working copies of loaded sessions.
    sessions: RwLock<HashMap<String, MusicLeagueSession>>,
    /// Id of the session turns operate on.
    active_session_id: RwLock<Option<String>>,
    /// Session ids with a turn currently in flight.
    in_flight: Mutex<HashSet<String>>,
    session_repository: Arc<dyn SessionRepository>,
    profile_repository: Arc<dyn ProfileRepository>,
    chat: Arc<dyn ChatProvider>,
    orchestrator: PlaylistOrchestrator,
    config: AppConfig,
}

impl ConversationEngine {
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        profile_repository: Arc<dyn ProfileRepository>,
        chat: Arc<dyn ChatProvider>,
        orchestrator: PlaylistOrchestrator,
        config: AppConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active_session_id: RwLock::new(None),
            in_flight: Mutex::new(HashSet::new()),
            session_repository,
            profile_repository,
            chat,
            orchestrator,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Creates a new session and makes it active.
    pub async fn create_session(&self) -> Result<MusicLeagueSession> {
        let session = MusicLeagueSession::new();
        self.session_repository.save(&session).await?;
        self.session_repository
            .set_active_session_id(&session.id)
            .await?;

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        *self.active_session_id.write().await = Some(session.id.clone());

        tracing::info!(session_id = %session.id, "created session");
        Ok(session)
    }

    /// Restores the last active session from storage, if any.
    pub async fn restore_last_session(&self) -> Result<Option<MusicLeagueSession>> {
        let Some(session_id) = self.session_repository.get_active_session_id().await? else {
            return Ok(None);
        };
        let Some(session) = self.session_repository.find_by_id(&session_id).await? else {
            return Ok(None);
        };

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        *self.active_session_id.write().await = Some(session.id.clone());

        Ok(Some(session))
    }

    /// Returns a snapshot of the active session.
    pub async fn active_session(&self) -> Option<MusicLeagueSession> {
        let session_id = self.active_session_id.read().await.clone()?;
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Lists all stored sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<MusicLeagueSession>> {
        self.session_repository.list_all().await
    }

    /// Switches the active session, loading it from storage when needed.
    pub async fn switch_session(&self, session_id: &str) -> Result<MusicLeagueSession> {
        let cached = self.sessions.read().await.get(session_id).cloned();
        let session = match cached {
            Some(session) => session,
            None => self
                .session_repository
                .find_by_id(session_id)
                .await?
                .ok_or_else(|| StrategistError::not_found("session", session_id))?,
        };

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        *self.active_session_id.write().await = Some(session.id.clone());
        self.session_repository
            .set_active_session_id(&session.id)
            .await?;

        Ok(session)
    }

    /// Deletes a session. Deletion is always an explicit user action.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        self.session_repository.delete(session_id).await?;

        let mut active = self.active_session_id.write().await;
        if active.as_deref() == Some(session_id) {
            *active = None;
            self.session_repository.clear_active_session_id().await?;
        }

        tracing::info!(session_id, "deleted session");
        Ok(())
    }

    /// Returns the user profile, if one has been built up.
    pub async fn profile(
        &self,
    ) -> Result<Option<strategist_core::preference::MusicLeagueUserProfile>> {
        self.profile_repository.load().await
    }

    // ------------------------------------------------------------------
    // Turn processing
    // ------------------------------------------------------------------

    /// Processes one user turn against the active session.
    pub async fn process_turn(&self, user_text: &str) -> Result<TurnOutcome> {
        // local rejections first: no session, credentials, overlapping turn.
        // none of these mutate session state.
        let session_id = self
            .active_session_id
            .read()
            .await
            .clone()
            .ok_or_else(|| StrategistError::not_found("session", "active"))?;

        self.chat
            .check_configuration()
            .map_err(|err| StrategistError::config(err.to_string()))?;

        let _guard = TurnGuard::acquire(&self.in_flight, &session_id)?;

        let mut session = self
            .sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| StrategistError::not_found("session", session_id.clone()))?;

        // record the user message; the first one doubles as the theme
        let first_message = session.is_first_user_message();
        session.append_message(MessageRole::User, user_text);
        if first_message {
            session.set_theme_if_unset(user_text);
        }
        self.commit(&session).await?;

        // profile is advisory context; a broken profile never blocks a turn
        let profile = match self.profile_repository.load().await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(%err, "failed to load user profile, continuing without it");
                None
            }
        };

        let system_prompt = prompt::build_system_prompt(&session, profile.as_ref());
        let request = self.build_chat_request(system_prompt, &session);

        let raw = match self.chat.complete(request).await {
            Ok(raw) => raw,
            Err(err) => {
                // the transcript stays a complete audit trail of what happened
                session.append_message(
                    MessageRole::System,
                    format!("Chat request failed: {}", err),
                );
                if let Err(save_err) = self.commit(&session).await {
                    tracing::warn!(%save_err, "failed to persist session after provider error");
                }
                return Err(StrategistError::provider(
                    err.to_string(),
                    err.is_retryable(),
                ));
            }
        };

        let outcome = match reply::parse_reply(&raw) {
            Some(parsed) => match self.apply_reply(&mut session, parsed, user_text).await {
                Ok(outcome) => outcome,
                // only the playlist call can fail in there; note it and surface it
                Err(err) => {
                    session.append_message(
                        MessageRole::System,
                        format!("Playlist creation failed: {}", err),
                    );
                    if let Err(save_err) = self.commit(&session).await {
                        tracing::warn!(%save_err, "failed to persist session after platform error");
                    }
                    return Err(err);
                }
            },
            None => {
                // degraded but non-fatal: show the raw text as-is
                tracing::warn!("no structured reply recovered, falling back to raw text");
                session.append_message(MessageRole::Assistant, raw.clone());
                (raw, false, None)
            }
        };
        let (assistant_text, recovered, playlist_outcome) = outcome;

        session.iterations += 1;
        self.commit(&session).await?;

        Ok(TurnOutcome {
            assistant_text,
            recovered,
            session,
            playlist_outcome,
        })
    }

    fn build_chat_request(&self, system_prompt: String, session: &MusicLeagueSession) -> ChatRequest {
        let mut messages = vec![ChatMessage::system(system_prompt)];
        for entry in &session.transcript {
            match entry.role {
                MessageRole::User => messages.push(ChatMessage::user(entry.content.clone())),
                MessageRole::Assistant => {
                    messages.push(ChatMessage::assistant(entry.content.clone()))
                }
                // system notes are audit trail, not provider context
                MessageRole::System => {}
            }
        }

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
        }
    }

    /// Applies a recovered reply to the session. Returns the assistant text
    /// and any playlist outcome.
    async fn apply_reply(
        &self,
        session: &mut MusicLeagueSession,
        parsed: StrategistReply,
        user_text: &str,
    ) -> Result<(String, bool, Option<PlaylistOutcome>)> {
        // the pick resolution below matches against the list as it stood
        // before this reply replaced it
        let prior_candidates = session.candidates.clone();

        if !parsed.candidates.is_empty() {
            session.candidates = parsed.candidates.clone();
        }

        if let Some(interpretation) = &parsed.interpretation {
            if let Some(theme) = &mut session.theme {
                theme.interpretation = Some(interpretation.clone());
            }
        }

        for preference in &parsed.extracted_preferences {
            record_session_preference(
                &mut session.session_preferences,
                preference.statement.clone(),
                preference.confidence,
                user_text,
            );
        }

        for rejection in &parsed.songs_to_reject {
            record_rejection(
                &mut session.rejected,
                rejection.title.clone(),
                rejection.artist.clone(),
                rejection.reason.clone(),
            );
        }

        let playlist_outcome = self
            .dispatch_action(session, &parsed, &prior_candidates)
            .await?;

        let assistant_text = parsed.message.clone().unwrap_or_default();
        if let Some(message) = &parsed.message {
            session.append_message(MessageRole::Assistant, message.clone());
        }

        Ok((assistant_text, true, playlist_outcome))
    }

    async fn dispatch_action(
        &self,
        session: &mut MusicLeagueSession,
        parsed: &StrategistReply,
        prior_candidates: &[Song],
    ) -> Result<Option<PlaylistOutcome>> {
        let Some(action) = parsed.action else {
            return Ok(None);
        };

        match action {
            ReplyAction::EnterFinalists => {
                if session.phase == SessionPhase::Conversation {
                    // the copy and the phase flip happen together
                    session.finalists = session.candidates.clone();
                    session.phase = SessionPhase::Finalists;
                    tracing::info!(count = session.finalists.len(), "entered finalists phase");
                } else {
                    tracing::warn!(phase = %session.phase, "ignoring enter_finalists");
                }
                Ok(None)
            }
            ReplyAction::FinalizePick => {
                if session.phase == SessionPhase::Complete {
                    tracing::warn!("ignoring finalize_pick on a completed session");
                    return Ok(None);
                }
                session.final_pick = resolve_final_pick(session, parsed, prior_candidates);
                session.phase = SessionPhase::Complete;
                if let Some(pick) = &session.final_pick {
                    tracing::info!(pick = %pick.label(), "recorded final pick");
                }

                // best-effort: a failed promotion must not fail the turn
                if let Err(err) = self.promote_session_preferences(session).await {
                    tracing::warn!(%err, "long-term preference promotion failed");
                }
                Ok(None)
            }
            ReplyAction::CreatePlaylist(platform) => {
                let outcome = self.orchestrator.create_playlist(platform, session).await?;
                Ok(Some(outcome))
            }
        }
    }

    async fn promote_session_preferences(&self, session: &MusicLeagueSession) -> Result<()> {
        if session.session_preferences.is_empty() {
            return Ok(());
        }

        let mut profile = self
            .profile_repository
            .load()
            .await?
            .unwrap_or_default();

        let statements: Vec<(String, Confidence)> = session
            .session_preferences
            .iter()
            .map(|p| (p.statement.clone(), p.confidence))
            .collect();

        let added = promote_statements(&mut profile, &statements);
        self.profile_repository.save(&profile).await?;
        tracing::info!(added, "promoted session preferences to the long-term profile");
        Ok(())
    }

    /// Writes the session back to the in-memory map and the repository.
    async fn commit(&self, session: &MusicLeagueSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        self.session_repository.save(session).await
    }
}

/// Resolution order for the final pick:
/// (a) the reply's first candidate, when it matches a pre-reply candidate
/// (b) the first finalist
/// (c) the first pre-reply candidate
/// (d) nothing
fn resolve_final_pick(
    session: &MusicLeagueSession,
    parsed: &StrategistReply,
    prior_candidates: &[Song],
) -> Option<Song> {
    if let Some(first) = parsed.candidates.first() {
        if let Some(existing) = prior_candidates
            .iter()
            .find(|candidate| candidate.matches(&first.title, &first.artist))
        {
            return Some(existing.clone());
        }
    }

    if let Some(finalist) = session.finalists.first() {
        return Some(finalist.clone());
    }

    if let Some(candidate) = prior_candidates.first() {
        return Some(candidate.clone());
    }

    None
}
