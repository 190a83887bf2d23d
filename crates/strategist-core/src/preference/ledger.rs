//! Preference bookkeeping rules. Pure functions, no I/O.

use std::cmp::Ordering;

use super::model::{
    Confidence, LongTermPreference, MusicLeagueUserProfile, RejectedSong, SessionPreference,
    Specificity,
};
use crate::song::normalized_pair;

/// Case-insensitive, whitespace-trimmed exact match against the rejected
/// list. Matching is exact normalized-string equality, not fuzzy.
pub fn is_rejected(rejected: &[RejectedSong], title: &str, artist: &str) -> bool {
    let key = normalized_pair(title, artist);
    rejected
        .iter()
        .any(|entry| normalized_pair(&entry.title, &entry.artist) == key)
}

/// Appends a rejection unless the (title, artist) pair is already present.
pub fn record_rejection(
    rejected: &mut Vec<RejectedSong>,
    title: impl Into<String>,
    artist: impl Into<String>,
    reason: impl Into<String>,
) {
    let title = title.into();
    let artist = artist.into();
    if is_rejected(rejected, &title, &artist) {
        return;
    }
    rejected.push(RejectedSong {
        title,
        artist,
        reason: reason.into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
}

/// Appends a session preference statement in insertion order.
pub fn record_session_preference(
    preferences: &mut Vec<SessionPreference>,
    statement: impl Into<String>,
    confidence: Confidence,
    evidence: impl Into<String>,
) {
    preferences.push(SessionPreference {
        statement: statement.into(),
        confidence,
        evidence: evidence.into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
}

/// Statements phrased against the current round stay session-specific;
/// everything else reads as a durable general taste.
fn classify_specificity(statement: &str) -> Specificity {
    let lower = statement.to_lowercase();
    let round_scoped = ["this round", "this theme", "for this round", "for this theme"];
    if round_scoped.iter().any(|marker| lower.contains(marker)) {
        Specificity::Specific
    } else {
        Specificity::General
    }
}

/// Promotes session statements into the profile's long-term list.
///
/// Statements are deduplicated case-insensitively against the existing
/// long-term statements. Only genuinely new statements are appended; an
/// existing match has its `last_confirmed_at` refreshed and its weight
/// nudged up instead. The evidence counter increments by the count of newly
/// added statements, not by the total considered.
///
/// Returns the number of newly added statements.
pub fn promote_statements(
    profile: &mut MusicLeagueUserProfile,
    statements: &[(String, Confidence)],
) -> usize {
    let now = chrono::Utc::now().to_rfc3339();
    let mut added = 0usize;

    for (statement, confidence) in statements {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        let key = statement.to_lowercase();

        if let Some(existing) = profile
            .long_term_preferences
            .iter_mut()
            .find(|p| p.statement.trim().to_lowercase() == key)
        {
            existing.last_confirmed_at = now.clone();
            existing.weight = (existing.weight + 0.05).min(1.0);
            continue;
        }

        profile.long_term_preferences.push(LongTermPreference {
            statement: statement.to_string(),
            specificity: classify_specificity(statement),
            weight: confidence.initial_weight(),
            added_at: now.clone(),
            last_confirmed_at: now.clone(),
        });
        added += 1;
    }

    if added > 0 {
        profile.evidence_count += added as u32;
        // asymptotic to 1.0 as evidence accumulates
        profile.confidence_weight =
            profile.evidence_count as f64 / (profile.evidence_count as f64 + 5.0);
    }
    profile.updated_at = now;

    added
}

/// Long-term preferences in prompt-rendering order: general before
/// specific, ties broken by weight descending.
pub fn prioritized_long_term(profile: &MusicLeagueUserProfile) -> Vec<&LongTermPreference> {
    let mut ordered: Vec<&LongTermPreference> = profile.long_term_preferences.iter().collect();
    ordered.sort_by(|a, b| {
        let rank = |s: Specificity| match s {
            Specificity::General => 0,
            Specificity::Specific => 1,
        };
        rank(a.specificity).cmp(&rank(b.specificity)).then_with(|| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(Ordering::Equal)
        })
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rejected_ignores_case_and_whitespace() {
        let mut rejected = Vec::new();
        record_rejection(&mut rejected, "Blue Monday", "New Order", "too obvious");

        assert!(is_rejected(&rejected, "blue monday", "new order"));
        assert!(is_rejected(&rejected, "  BLUE MONDAY  ", " New Order "));
        assert!(!is_rejected(&rejected, "Blue Monday", "Orgy"));
    }

    #[test]
    fn test_record_rejection_deduplicates_pair() {
        let mut rejected = Vec::new();
        record_rejection(&mut rejected, "Yellow", "Coldplay", "overplayed");
        record_rejection(&mut rejected, "YELLOW", " coldplay ", "again");

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].reason, "overplayed");
    }

    #[test]
    fn test_promotion_dedup_and_evidence_counter() {
        let mut profile = MusicLeagueUserProfile::new();

        let added = promote_statements(
            &mut profile,
            &[
                ("Prefers synth-heavy production".to_string(), Confidence::High),
                ("Dislikes novelty songs".to_string(), Confidence::Medium),
            ],
        );
        assert_eq!(added, 2);
        assert_eq!(profile.evidence_count, 2);

        // same statement again, different casing: no new entry, counter unchanged
        let added = promote_statements(
            &mut profile,
            &[
                ("prefers SYNTH-heavy production".to_string(), Confidence::Low),
                ("Enjoys b-sides over singles".to_string(), Confidence::Low),
            ],
        );
        assert_eq!(added, 1);
        assert_eq!(profile.evidence_count, 3);
        assert_eq!(profile.long_term_preferences.len(), 3);
    }

    #[test]
    fn test_reconfirmation_nudges_weight() {
        let mut profile = MusicLeagueUserProfile::new();
        promote_statements(
            &mut profile,
            &[("Prefers live recordings".to_string(), Confidence::Low)],
        );
        let before = profile.long_term_preferences[0].weight;

        promote_statements(
            &mut profile,
            &[("prefers live recordings".to_string(), Confidence::Low)],
        );
        let after = profile.long_term_preferences[0].weight;
        assert!(after > before);
        assert!(after <= 1.0);
    }

    #[test]
    fn test_prioritized_ordering() {
        let mut profile = MusicLeagueUserProfile::new();
        let now = chrono::Utc::now().to_rfc3339();
        let entry = |statement: &str, specificity, weight| LongTermPreference {
            statement: statement.to_string(),
            specificity,
            weight,
            added_at: now.clone(),
            last_confirmed_at: now.clone(),
        };
        profile.long_term_preferences = vec![
            entry("specific strong", Specificity::Specific, 0.9),
            entry("general weak", Specificity::General, 0.2),
            entry("general strong", Specificity::General, 0.8),
        ];

        let ordered = prioritized_long_term(&profile);
        let statements: Vec<&str> = ordered.iter().map(|p| p.statement.as_str()).collect();
        assert_eq!(
            statements,
            vec!["general strong", "general weak", "specific strong"]
        );
    }

    #[test]
    fn test_blank_statements_are_skipped() {
        let mut profile = MusicLeagueUserProfile::new();
        let added = promote_statements(
            &mut profile,
            &[("   ".to_string(), Confidence::High)],
        );
        assert_eq!(added, 0);
        assert!(profile.long_term_preferences.is_empty());
    }
}
