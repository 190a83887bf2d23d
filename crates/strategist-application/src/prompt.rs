//! System prompt construction.
//!
//! The prompt is rebuilt from session state on every turn so the provider
//! always sees the current candidates, the full rejection list, and both
//! preference tiers. Two variants exist: the default conversation prompt
//! and a narrower comparative one once the session enters finalists.

use strategist_core::preference::{
    MusicLeagueUserProfile, Specificity, prioritized_long_term,
};
use strategist_core::session::{MusicLeagueSession, SessionPhase};

/// Reply-shape instructions appended to every system prompt.
const REPLY_FORMAT: &str = r#"Respond with a single JSON object and nothing else. Keys:
- "candidates": array of 5-8 song objects, each with "title", "artist", "album" (optional), "year" (optional), "genre" (optional), "reason" (why it fits the theme), and "question" (a probing question about this specific song, optional)
- "message": your conversational reply to the user (string, required)
- "interpretation": your current reading of the theme (string, optional)
- "action": one of "enter_finalists", "finalize_pick", "create_spotify_playlist", "create_youtube_music_playlist", or null
- "extractedPreferences": array of {"statement", "confidence"} for any taste preferences the user's message revealed ("confidence" is "high", "medium", or "low")
- "songsToReject": array of {"title", "artist", "reason"} for songs the user turned down this turn

Use "enter_finalists" only when the user wants to narrow down to a short list for comparison. Use "finalize_pick" only when the user has clearly committed to one song. Use a create playlist action only when the user explicitly asks for a playlist."#;

fn push_theme(out: &mut String, session: &MusicLeagueSession) {
    if let Some(theme) = &session.theme {
        out.push_str(&format!("\n## Round theme\n{}\n", theme.raw_text));
        if let Some(interpretation) = &theme.interpretation {
            out.push_str(&format!("Current interpretation: {}\n", interpretation));
        }
        if let Some(angle) = &theme.angle {
            out.push_str(&format!("Chosen angle: {}\n", angle));
        }
    }
}

fn push_candidates(out: &mut String, session: &MusicLeagueSession) {
    let (heading, songs) = if session.phase == SessionPhase::Finalists {
        ("\n## Finalists\n", &session.finalists)
    } else {
        ("\n## Current candidates\n", &session.candidates)
    };

    if songs.is_empty() {
        return;
    }

    out.push_str(heading);
    for (index, song) in songs.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} - {}: {}\n",
            index + 1,
            song.title,
            song.artist,
            song.reason
        ));
    }
}

fn push_rejections(out: &mut String, session: &MusicLeagueSession) {
    if session.rejected.is_empty() {
        return;
    }

    out.push_str("\n## Rejected songs - NEVER propose any of these again\n");
    for entry in &session.rejected {
        out.push_str(&format!(
            "- {} - {} ({})\n",
            entry.title, entry.artist, entry.reason
        ));
    }
}

fn push_session_preferences(out: &mut String, session: &MusicLeagueSession) {
    if session.session_preferences.is_empty() {
        return;
    }

    out.push_str("\n## Preferences stated this session\n");
    for preference in &session.session_preferences {
        out.push_str(&format!(
            "- {} (confidence: {:?})\n",
            preference.statement, preference.confidence
        ));
    }
}

fn push_long_term_preferences(out: &mut String, profile: Option<&MusicLeagueUserProfile>) {
    let Some(profile) = profile else {
        return;
    };
    let ordered = prioritized_long_term(profile);
    if ordered.is_empty() && profile.summary.is_empty() {
        return;
    }

    out.push_str("\n## What you know about this user's taste\n");
    if !profile.summary.is_empty() {
        out.push_str(&format!("{}\n", profile.summary));
    }
    for preference in ordered {
        let kind = match preference.specificity {
            Specificity::General => "general",
            Specificity::Specific => "specific",
        };
        out.push_str(&format!("- [{}] {}\n", kind, preference.statement));
    }
}

fn push_playlist_status(out: &mut String, session: &MusicLeagueSession) {
    if let Some(record) = &session.playlist {
        out.push_str(&format!(
            "\n## Playlist\nA playlist was already created on {}: {}\n",
            record.platform.display_name(),
            record.playlist_url
        ));
    }
}

/// Builds the system prompt for the session's current phase.
pub fn build_system_prompt(
    session: &MusicLeagueSession,
    profile: Option<&MusicLeagueUserProfile>,
) -> String {
    let mut out = String::with_capacity(2048);

    match session.phase {
        SessionPhase::Finalists => {
            out.push_str(
                "You are a Music League strategist helping a user pick one song for a themed \
                 playlist round. The session is in the finalists phase: the short list below is \
                 fixed. Compare the finalists head to head against the theme, argue trade-offs, \
                 and push the user toward a single pick. Do not introduce new songs unless the \
                 user asks you to reopen the search.\n",
            );
        }
        _ => {
            out.push_str(
                "You are a Music League strategist helping a user pick one song for a themed \
                 playlist round. Propose strong, theme-fitting candidates, probe the user's \
                 taste with pointed questions, and refine the list every turn. Favor picks \
                 other players are unlikely to duplicate.\n",
            );
        }
    }

    push_theme(&mut out, session);
    push_candidates(&mut out, session);
    push_rejections(&mut out, session);
    push_session_preferences(&mut out, session);
    push_long_term_preferences(&mut out, profile);
    push_playlist_status(&mut out, session);

    out.push_str("\n## Reply format\n");
    out.push_str(REPLY_FORMAT);

    out
}
