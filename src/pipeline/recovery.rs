//! Defensive JSON recovery from model output.
//!
//! The completion backend is not guaranteed to emit clean JSON: responses
//! arrive wrapped in prose, fenced in Markdown, or truncated mid-object when
//! the output-token cap is hit. `recover` runs a layered sequence of
//! extraction attempts, cheapest first, and returns the first object that
//! parses. No grammar-aware repair — just enough surgery to rescue the
//! overwhelmingly common failure shapes.

use serde_json::Value;
use thiserror::Error;

/// Maximum preview length attached to a [`RecoveryError`].
const PREVIEW_MAX_CHARS: usize = 160;

/// Characters considered safe truncation points when shrinking a candidate.
const SAFE_SHRINK_CHARS: &[char] = &['}', '"', ']', ' ', ','];

#[derive(Debug, Error)]
#[error("no valid JSON object could be extracted: {preview}")]
pub struct RecoveryError {
    /// Whitespace-collapsed preview of the offending text.
    pub preview: String,
}

/// Extract a JSON object from raw model output.
///
/// Ordered attempts, first success wins:
/// 1. normalize exotic whitespace/quotes, try a direct parse
/// 2. extract the interior of a fenced code block
/// 3. strip an unmatched opening fence line
/// 4. take the first-`{`-to-last-`}` substring
/// 5. repair a truncated candidate (close open strings/brackets)
/// 6. shrink the candidate from the end and retry at each safe point
pub fn recover(raw: &str) -> Result<Value, RecoveryError> {
    let text = normalize(raw);
    let trimmed = text.trim();

    if let Some(value) = parse_object(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Some(value) = parse_object(inner.trim()) {
            return Ok(value);
        }
    }

    if let Some(rest) = strip_unclosed_fence(trimmed) {
        if let Some(value) = parse_object(rest.trim()) {
            return Ok(value);
        }
    }

    if let Some(candidate) = balanced_candidate(trimmed) {
        if let Some(value) = parse_object(candidate) {
            return Ok(value);
        }
        if let Some(value) = parse_object(&repair_truncation(candidate)) {
            return Ok(value);
        }
        if let Some(value) = shrink_and_retry(candidate) {
            return Ok(value);
        }
    }

    Err(RecoveryError {
        preview: preview(trimmed),
    })
}

/// Replace non-breaking spaces and curly quotes with ASCII equivalents.
fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{a0}' => ' ',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            other => other,
        })
        .collect()
}

/// Parse `text` if it yields a JSON object; arrays/scalars are rejected.
fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Interior of the first complete ```-fenced block, tolerating a `json` tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip an optional language tag on the fence line
    let content_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let content = &after_open[content_start..];
    let close = content.find("```")?;
    Some(&content[..close])
}

/// If the text begins with a fence marker that never closes, drop the
/// opening fence line and return the remainder.
fn strip_unclosed_fence(text: &str) -> Option<&str> {
    if !text.starts_with("```") {
        return None;
    }
    let after_open = &text[3..];
    if after_open.contains("```") {
        return None; // handled by fenced_block
    }
    match after_open.find('\n') {
        Some(i) => Some(&after_open[i + 1..]),
        None => Some(after_open.trim_start_matches(|c: char| c.is_alphanumeric())),
    }
}

/// Substring from the first `{` to the last `}` inclusive, or from the
/// first `{` to the end when no closing brace survived truncation.
fn balanced_candidate(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    match text.rfind('}') {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => Some(&text[start..]),
    }
}

/// Truncation repair: close an open string, drop a dangling separator,
/// then append the closers for every unmatched `[`/`{` in nesting order.
fn repair_truncation(candidate: &str) -> String {
    let mut repaired = candidate.to_string();

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in candidate.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => stack.push(c),
            '}' if !in_string => {
                if stack.last() == Some(&'{') {
                    stack.pop();
                }
            }
            ']' if !in_string => {
                if stack.last() == Some(&'[') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    if in_string {
        repaired.push('"');
    }

    // A cut right after `,` or `:` leaves a separator nothing can follow
    while repaired
        .trim_end()
        .ends_with(|c| c == ',' || c == ':')
    {
        let trimmed_len = repaired.trim_end().len();
        repaired.truncate(trimmed_len.saturating_sub(1));
    }

    // Innermost-first so arrays close before the objects containing them
    for open in stack.iter().rev() {
        repaired.push(match open {
            '[' => ']',
            _ => '}',
        });
    }
    repaired
}

/// Shrink the candidate from the end toward the nearest structurally safe
/// character, repairing and re-parsing at each shrink point.
fn shrink_and_retry(candidate: &str) -> Option<Value> {
    let chars: Vec<(usize, char)> = candidate.char_indices().collect();
    for &(idx, c) in chars.iter().rev().skip(1) {
        if !SAFE_SHRINK_CHARS.contains(&c) {
            continue;
        }
        let shrunk = &candidate[..idx + c.len_utf8()];
        if let Some(value) = parse_object(&repair_truncation(shrunk)) {
            return Some(value);
        }
    }
    None
}

/// Whitespace-collapsed preview, capped at [`PREVIEW_MAX_CHARS`].
fn preview(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(PREVIEW_MAX_CHARS).collect()
}
