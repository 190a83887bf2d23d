//! Conversion of loosely-shaped parsed records into `Song` entities.
//!
//! LLM replies carry song records with drifting key names and types. This
//! module accepts the known alternate spellings, validates the essentials,
//! and drops anything unusable rather than erroring.

use serde_json::Value;
use uuid::Uuid;

use super::model::Song;

const TITLE_KEYS: &[&str] = &["title", "song", "track"];
const ARTIST_KEYS: &[&str] = &["artist", "artistName", "band"];
const REASON_KEYS: &[&str] = &["reason", "rationale", "why", "notes"];
const QUESTION_KEYS: &[&str] = &["question", "probe"];
const VIDEO_ID_KEYS: &[&str] = &["videoId", "video_id"];
const TRACK_REF_KEYS: &[&str] = &["trackId", "track_id", "uri", "trackUri"];

const PLACEHOLDER_REASON: &str = "No rationale given";

/// First non-empty trimmed string found under any of the given keys.
fn string_field(record: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(text) = record.get(*key).and_then(Value::as_str) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Coerces a `year` value to a finite positive integer, or drops it.
fn year_field(record: &Value) -> Option<u32> {
    let value = record.get("year")?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok().filter(|&y| y > 0);
    }
    if let Some(f) = value.as_f64() {
        if f.is_finite() && f > 0.0 && f < u32::MAX as f64 {
            return Some(f as u32);
        }
        return None;
    }
    value
        .as_str()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&y| y > 0)
}

fn bool_field(record: &Value, key: &str) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Converts one parsed record into a `Song`, or `None` when title or artist
/// resolves to empty.
///
/// Any id present in the input is ignored; every normalized song gets a
/// freshly generated one.
fn normalize_song(record: &Value) -> Option<Song> {
    if !record.is_object() {
        return None;
    }

    let title = string_field(record, TITLE_KEYS)?;
    let artist = string_field(record, ARTIST_KEYS)?;

    Some(Song {
        id: Uuid::new_v4().to_string(),
        title,
        artist,
        album: string_field(record, &["album"]),
        year: year_field(record),
        genre: string_field(record, &["genre"]),
        reason: string_field(record, REASON_KEYS)
            .unwrap_or_else(|| PLACEHOLDER_REASON.to_string()),
        question: string_field(record, QUESTION_KEYS),
        favorite: bool_field(record, "favorite"),
        eliminated: bool_field(record, "eliminated"),
        video_id: string_field(record, VIDEO_ID_KEYS),
        track_ref: string_field(record, TRACK_REF_KEYS),
    })
}

/// Normalizes a batch of parsed records, dropping the unusable ones.
pub fn normalize_songs(records: &[Value]) -> Vec<Song> {
    let songs: Vec<Song> = records.iter().filter_map(normalize_song).collect();
    if songs.len() < records.len() {
        tracing::debug!(
            dropped = records.len() - songs.len(),
            "discarded song records without usable title/artist"
        );
    }
    songs
}

/// Entry point for whole payloads: tries an array-shaped payload first, then
/// falls back to an object carrying a `songs` or `tracks` array property.
pub fn parse_songs_payload(value: &Value) -> Vec<Song> {
    if let Some(records) = value.as_array() {
        return normalize_songs(records);
    }

    for key in ["songs", "tracks"] {
        if let Some(records) = value.get(key).and_then(Value::as_array) {
            return normalize_songs(records);
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_basic_record() {
        let records = vec![json!({
            "title": "Blue Monday",
            "artist": "New Order",
            "year": 1983,
            "genre": "synth-pop",
            "reason": "fits theme",
            "question": "too dark?"
        })];

        let songs = normalize_songs(&records);
        assert_eq!(songs.len(), 1);
        let song = &songs[0];
        assert_eq!(song.title, "Blue Monday");
        assert_eq!(song.artist, "New Order");
        assert_eq!(song.year, Some(1983));
        assert_eq!(song.genre.as_deref(), Some("synth-pop"));
        assert_eq!(song.reason, "fits theme");
        assert_eq!(song.question.as_deref(), Some("too dark?"));
        assert!(!song.id.is_empty());
    }

    #[test]
    fn test_alternate_key_spellings() {
        let records = vec![json!({
            "song": "Yellow",
            "band": "Coldplay",
            "rationale": "color theme"
        })];

        let songs = normalize_songs(&records);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Yellow");
        assert_eq!(songs[0].artist, "Coldplay");
        assert_eq!(songs[0].reason, "color theme");
    }

    #[test]
    fn test_missing_reason_gets_placeholder() {
        let records = vec![json!({"title": "Yellow", "artist": "Coldplay"})];
        let songs = normalize_songs(&records);
        assert_eq!(songs[0].reason, PLACEHOLDER_REASON);
    }

    #[test]
    fn test_empty_title_drops_record() {
        let records = vec![
            json!({"title": "   ", "artist": "Coldplay"}),
            json!({"artist": "Coldplay"}),
            json!({"title": "Yellow", "artist": "Coldplay"}),
        ];

        let songs = normalize_songs(&records);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Yellow");
    }

    #[test]
    fn test_supplied_id_is_ignored() {
        let records = vec![json!({"id": "keep-me", "title": "Yellow", "artist": "Coldplay"})];
        let songs = normalize_songs(&records);
        assert_ne!(songs[0].id, "keep-me");
    }

    #[test]
    fn test_year_coercion() {
        let year_of = |v: Value| {
            let records = vec![json!({"title": "T", "artist": "A", "year": v})];
            normalize_songs(&records)[0].year
        };

        assert_eq!(year_of(json!(1983)), Some(1983));
        assert_eq!(year_of(json!("1983")), Some(1983));
        assert_eq!(year_of(json!(1983.0)), Some(1983));
        assert_eq!(year_of(json!(-5)), None);
        assert_eq!(year_of(json!("eighties")), None);
        assert_eq!(year_of(json!(null)), None);
    }

    #[test]
    fn test_payload_array_shape() {
        let payload = json!([{"title": "A", "artist": "B"}]);
        assert_eq!(parse_songs_payload(&payload).len(), 1);
    }

    #[test]
    fn test_payload_object_with_songs() {
        let payload = json!({"songs": [{"title": "A", "artist": "B"}]});
        assert_eq!(parse_songs_payload(&payload).len(), 1);

        let payload = json!({"tracks": [{"track": "A", "artistName": "B"}]});
        assert_eq!(parse_songs_payload(&payload).len(), 1);
    }

    #[test]
    fn test_payload_unusable_shapes() {
        assert!(parse_songs_payload(&json!("just a string")).is_empty());
        assert!(parse_songs_payload(&json!({"other": 1})).is_empty());
        assert!(parse_songs_payload(&json!(null)).is_empty());
    }

    #[test]
    fn test_external_refs() {
        let records = vec![json!({
            "title": "T", "artist": "A",
            "videoId": "dQw4w9WgXcQ",
            "uri": "spotify:track:123"
        })];
        let songs = normalize_songs(&records);
        assert_eq!(songs[0].video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(songs[0].track_ref.as_deref(), Some("spotify:track:123"));
    }
}
