//! Recover a candidate JSON value from free-form backend text.
//!
//! Backends wrap their answers in prose, markdown fences or trailing commentary. The
//! extractor first tries the whole text, then scans for balanced top-level bracketed
//! regions with a string-aware depth counter and keeps the largest one that parses.
//! A region containing nested objects is matched as a whole, never cut at the first `}`.
use serde_json::Value;

/// Extract the most plausible JSON value from `text`, or `None` when nothing parses
pub fn extract(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let bytes = text.as_bytes();
    let mut best: Option<(usize, Value)> = None;
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'{' | b'[') {
            if let Some(end) = balanced_span(text, i) {
                if let Ok(value) = serde_json::from_str::<Value>(&text[i..end]) {
                    let len = end - i;
                    if best.as_ref().map_or(true, |(longest, _)| len > *longest) {
                        best = Some((len, value));
                    }
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }
    best.map(|(_, value)| value)
}

/// Find the end (exclusive) of the bracketed region opening at byte offset `start`.
///
/// Brackets inside JSON strings are ignored. Returns `None` when `start` is not an opening
/// bracket, when a closing bracket does not match, or when the text ends first.
pub fn balanced_span(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(start), Some(b'{' | b'[')) {
        return None;
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(byte) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}
