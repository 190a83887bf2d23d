//! Best-effort recovery of JSON values from raw LLM reply text.
//!
//! Chat completions that were asked for JSON routinely come back wrapped in
//! markdown fences, with smart quotes, trailing commas, unquoted string
//! values, or cut off mid-object. This module turns such text into a parsed
//! `serde_json::Value` when any of its strategies succeeds, and degrades to
//! a "no value" result otherwise. Nothing in here panics or returns an error:
//! callers treat `None` / an empty `Vec` as "nothing usable".
//!
//! Strategy order (first success wins):
//! 1. extract the first top-level balanced `{}` / `[]` span
//! 2. sanitize the span (fences, smart quotes, trailing commas, unquoted
//!    scalars, unquoted keys) and strict-parse it
//! 3. walk a repair ladder over the unsanitized span, one fix at a time
//! 4. for arrays only, salvage per-line song objects as a last resort

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Which delimiter pair a balanced-span scan should track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Object,
    Array,
}

impl Delimiter {
    fn open(self) -> char {
        match self {
            Delimiter::Object => '{',
            Delimiter::Array => '[',
        }
    }

    fn close(self) -> char {
        match self {
            Delimiter::Object => '}',
            Delimiter::Array => ']',
        }
    }
}

/// Returns the first top-level balanced region for the requested delimiter
/// pair, honoring string literals and backslash escapes.
///
/// Returns `None` when the text contains no opening delimiter or the depth
/// never returns to zero (truncated output).
pub fn extract_balanced_span(raw: &str, delim: Delimiter) -> Option<&str> {
    let open = delim.open();
    let close = delim.close();
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = None;

    for (idx, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            if depth == 0 {
                start = Some(idx);
            }
            depth += 1;
        } else if ch == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                // close delimiters are single-byte, so idx + 1 is a char boundary
                return Some(&raw[start?..idx + 1]);
            }
        }
    }

    None
}

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").unwrap());
static BARE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(0|[1-9]\d*)(\.\d+)?([eE][+-]?\d+)?$").unwrap());

/// Strips markdown code-fence markers (```` ``` ````, ```` ```json ````).
fn strip_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").into_owned()
}

/// Normalizes typographic quotation marks to their ASCII equivalents.
fn fix_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            other => other,
        })
        .collect()
}

/// Removes trailing commas immediately before a closing brace or bracket.
///
/// String-aware, so a literal ",}" inside a string value is left alone.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                // drop the comma; the whitespace copies on later iterations
                i += 1;
                continue;
            }
        }
        out.push(ch);
        i += 1;
    }

    out
}

/// True when the token may legally stand unquoted in JSON.
fn is_bare_literal(token: &str) -> bool {
    matches!(token, "true" | "false" | "null") || BARE_NUMBER_RE.is_match(token)
}

fn push_quoted(out: &mut String, token: &str) {
    out.push('"');
    for ch in token.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
}

/// Wraps unquoted scalar values after a colon in double quotes, unless the
/// token parses as a boolean, null, or a bare number.
///
/// The scan tracks string-literal state so values already inside quotes are
/// left alone. Classification of the token itself is a regex heuristic:
/// version-like strings ("3.5") are kept as numbers. Known approximation.
fn quote_unquoted_values(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some((_, ch)) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ':' => {
                out.push(ch);
                // copy whitespace following the colon
                while let Some(&(_, ws)) = chars.peek() {
                    if ws == ' ' || ws == '\t' {
                        out.push(ws);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let starts_value = chars
                    .peek()
                    .map(|&(_, c)| !matches!(c, '"' | '{' | '[' | '\n' | '\r' | ',' | '}' | ']'))
                    .unwrap_or(false);
                if !starts_value {
                    continue;
                }
                // capture the bare token up to a structural boundary
                let mut token = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if matches!(c, ',' | '}' | ']' | '\n' | '\r') {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                let trimmed = token.trim_end();
                let trailing_ws = &token[trimmed.len()..];
                if is_bare_literal(trimmed) {
                    out.push_str(trimmed);
                } else {
                    push_quoted(&mut out, trimmed);
                }
                out.push_str(trailing_ws);
            }
            other => out.push(other),
        }
    }

    out
}

/// Wraps bare identifier keys (`{candidates: ...}`) in double quotes.
///
/// Same string-aware scan as `quote_unquoted_values`; a key is an identifier
/// immediately following `{` or `,` and followed by a colon.
fn quote_unquoted_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    // at the position where an object key may start
    let mut expect_key = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                expect_key = false;
                out.push(ch);
            }
            '{' | ',' => {
                expect_key = true;
                out.push(ch);
            }
            c if c.is_whitespace() => out.push(c),
            c if expect_key && (c.is_ascii_alphabetic() || c == '_') => {
                let mut ident = String::new();
                ident.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // only a key if a colon follows (past whitespace)
                let mut lookahead = chars.clone();
                let mut ws = String::new();
                let mut is_key = false;
                while let Some(&next) = lookahead.peek() {
                    if next == ' ' || next == '\t' {
                        ws.push(next);
                        lookahead.next();
                    } else {
                        is_key = next == ':';
                        break;
                    }
                }
                if is_key {
                    push_quoted(&mut out, &ident);
                } else {
                    out.push_str(&ident);
                }
                out.push_str(&ws);
                for _ in 0..ws.len() {
                    chars.next();
                }
                expect_key = false;
            }
            other => {
                expect_key = false;
                out.push(other);
            }
        }
    }

    out
}

/// Escapes raw newlines and tabs that appear inside string literals.
fn escape_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                other => out.push(other),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }

    out
}

/// Applies every sanitization step unconditionally, in order.
pub fn sanitize(text: &str) -> String {
    let text = strip_fences(text);
    let text = fix_smart_quotes(&text);
    let text = strip_trailing_commas(&text);
    let text = quote_unquoted_keys(&text);
    quote_unquoted_values(&text)
}

fn strict_parse(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// Re-attempts a strict parse after each successive repair, starting from
/// the unmodified text. First success short-circuits.
fn repair_ladder(text: &str) -> Option<Value> {
    if let Some(value) = strict_parse(text) {
        return Some(value);
    }

    let rungs: [fn(&str) -> String; 4] = [
        strip_fences,
        fix_smart_quotes,
        strip_trailing_commas,
        escape_control_chars,
    ];

    let mut current = text.to_string();
    for (i, fix) in rungs.iter().enumerate() {
        current = fix(&current);
        if let Some(value) = strict_parse(&current) {
            tracing::debug!(rung = i + 1, "json repair ladder succeeded");
            return Some(value);
        }
    }

    None
}

/// Keeps only lines that look like individual song objects, recovers a
/// balanced object span from each, and collects the ones that parse.
fn salvage_song_lines(raw: &str) -> Vec<Value> {
    let mut objects = Vec::new();

    for line in raw.lines() {
        if !line.contains("\"title\"") && !line.contains("\"artist\"") {
            continue;
        }
        let Some(span) = extract_balanced_span(line, Delimiter::Object) else {
            continue;
        };
        match strict_parse(&sanitize(span)) {
            Some(value) if value.is_object() => objects.push(value),
            _ => {}
        }
    }

    if !objects.is_empty() {
        tracing::debug!(count = objects.len(), "salvaged song objects line by line");
    }
    objects
}

/// Best-effort parse of one JSON object out of arbitrary reply text.
///
/// Returns `None` when every strategy fails or the recovered value is not a
/// non-array object. Never panics.
pub fn parse_json_object(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    let input = extract_balanced_span(raw, Delimiter::Object).unwrap_or(raw);

    if let Some(value) = strict_parse(&sanitize(input)) {
        if value.is_object() {
            return Some(value);
        }
    }

    repair_ladder(input).filter(Value::is_object)
}

/// Best-effort parse of one JSON array out of arbitrary reply text.
///
/// Returns an empty vector when every strategy fails; callers treat that as
/// "nothing usable", not as an error. Never panics.
pub fn parse_json_array(raw: &str) -> Vec<Value> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let input = extract_balanced_span(raw, Delimiter::Array).unwrap_or(raw);

    if let Some(Value::Array(items)) = strict_parse(&sanitize(input)) {
        return items;
    }

    if let Some(Value::Array(items)) = repair_ladder(input) {
        return items;
    }

    salvage_song_lines(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_object_span() {
        let raw = r#"Sure, here you go: {"a": 1, "b": {"c": 2}} and some trailing prose"#;
        assert_eq!(
            extract_balanced_span(raw, Delimiter::Object),
            Some(r#"{"a": 1, "b": {"c": 2}}"#)
        );
    }

    #[test]
    fn test_extract_span_honors_strings() {
        let raw = r#"{"a": "closing } inside", "b": 2}"#;
        assert_eq!(extract_balanced_span(raw, Delimiter::Object), Some(raw));
    }

    #[test]
    fn test_extract_span_honors_escapes() {
        let raw = r#"{"a": "quote \" then } inside", "b": 2} tail"#;
        assert_eq!(
            extract_balanced_span(raw, Delimiter::Object),
            Some(r#"{"a": "quote \" then } inside", "b": 2}"#)
        );
    }

    #[test]
    fn test_extract_span_truncated_returns_none() {
        assert_eq!(
            extract_balanced_span(r#"{"a": 1, "b": ["#, Delimiter::Object),
            None
        );
    }

    #[test]
    fn test_parse_object_plain() {
        let value = parse_json_object(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(value, json!({"message": "hi"}));
    }

    #[test]
    fn test_parse_object_fenced() {
        let raw = "```json\n{\"message\": \"hi\"}\n```";
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value, json!({"message": "hi"}));
    }

    #[test]
    fn test_parse_object_rejects_array() {
        assert!(parse_json_object(r#"[1, 2, 3]"#).is_none());
    }

    #[test]
    fn test_parse_object_smart_quotes_and_trailing_comma() {
        let raw = "{\u{201C}message\u{201D}: \u{201C}hi\u{201D},}";
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value, json!({"message": "hi"}));
    }

    #[test]
    fn test_parse_object_unquoted_values_and_keys() {
        // the repair-ladder scenario: unquoted keys, unquoted value, trailing comma
        let raw = r#"{candidates: [{title: "Yellow", artist: "Coldplay", reason: "color theme",}], message: "ok"}"#;
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["message"], json!("ok"));
        assert_eq!(value["candidates"][0]["title"], json!("Yellow"));
        assert_eq!(value["candidates"][0]["reason"], json!("color theme"));
    }

    #[test]
    fn test_parse_object_coerces_unquoted_scalars() {
        let raw = r#"{"genre": synth-pop, "year": 1983, "live": true}"#;
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["genre"], json!("synth-pop"));
        assert_eq!(value["year"], json!(1983));
        assert_eq!(value["live"], json!(true));
    }

    #[test]
    fn test_parse_object_embedded_newline_in_string() {
        let raw = "{\"message\": \"line one\nline two\"}";
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["message"], json!("line one\nline two"));
    }

    #[test]
    fn test_parse_object_colon_inside_string_survives() {
        let raw = r#"{"reason": "fits theme: colors, mostly"}"#;
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["reason"], json!("fits theme: colors, mostly"));
    }

    #[test]
    fn test_parse_object_never_panics_on_garbage() {
        for raw in ["", "   ", "no json here", "{\"a\": ", "}{", "{{{{"] {
            let _ = parse_json_object(raw);
        }
    }

    #[test]
    fn test_parse_array_plain() {
        let items = parse_json_array(r#"[{"title": "Blue Monday"}]"#);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], json!("Blue Monday"));
    }

    #[test]
    fn test_parse_array_fenced_with_prose() {
        let raw = "Here are the songs:\n```json\n[{\"title\": \"Blue Monday\"}, {\"title\": \"Yellow\"}]\n```\nEnjoy!";
        let items = parse_json_array(raw);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_parse_array_trailing_comma() {
        let items = parse_json_array(r#"[{"title": "A"}, {"title": "B"},]"#);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_parse_array_empty_on_failure() {
        assert!(parse_json_array("").is_empty());
        assert!(parse_json_array("no songs, sorry").is_empty());
        assert!(parse_json_array(r#"[{"title": "#).is_empty());
    }

    #[test]
    fn test_parse_array_line_salvage() {
        // truncated array: the last object never closes, but complete lines
        // can still be recovered one by one
        let raw = concat!(
            "[\n",
            r#"{"title": "Blue Monday", "artist": "New Order"},"#,
            "\n",
            r#"{"title": "Yellow", "artist": "Coldplay"},"#,
            "\n",
            r#"{"title": "Truncat"#,
        );
        let items = parse_json_array(raw);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["artist"], json!("New Order"));
        assert_eq!(items[1]["title"], json!("Yellow"));
    }

    #[test]
    fn test_trailing_comma_inside_string_survives() {
        let raw = r#"{"a": "x,} y", "b": [1, 2],}"#;
        let value = parse_json_object(raw).unwrap();
        assert_eq!(value["a"], json!("x,} y"));
        assert_eq!(value["b"], json!([1, 2]));
    }

    #[test]
    fn test_sanitize_preserves_valid_json() {
        let raw = r#"{"a": "text with, commas", "b": [1, 2], "c": null}"#;
        let value = parse_json_object(raw).unwrap();
        assert_eq!(
            value,
            json!({"a": "text with, commas", "b": [1, 2], "c": null})
        );
    }
}
