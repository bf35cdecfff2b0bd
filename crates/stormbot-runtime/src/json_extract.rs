//! Locate a JSON object or array inside an untrusted oracle reply.
//!
//! Replies routinely arrive wrapped in prose or markdown fencing. The
//! extractor strips fences, then scans for the first balanced `[...]`
//! (preferred, since a sequence is more specific than a single decision) and
//! falls back to the first balanced `{...}`. Candidates that fail to parse
//! are skipped and the scan continues.

use serde_json::Value;

/// Extract the first parseable JSON array or object from `text`.
///
/// Returns `None` when no parseable JSON is present anywhere in the reply.
pub fn extract_json(text: &str) -> Option<Value> {
    let cleaned = text.replace("```json", "").replace("```", "");
    find_balanced(&cleaned, '[', ']').or_else(|| find_balanced(&cleaned, '{', '}'))
}

/// Scan for balanced `open`…`close` spans and return the first one that
/// parses. String literals are honored so brackets inside quoted text do not
/// confuse the depth count.
fn find_balanced(text: &str, open: char, close: char) -> Option<Value> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut search_from = 0;

    while let Some(start_pos) = chars[search_from..]
        .iter()
        .position(|&(_, c)| c == open)
        .map(|p| p + search_from)
    {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for &(idx, c) in &chars[start_pos..] {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' if in_string => escaped = true,
                '"' => in_string = !in_string,
                c if c == open && !in_string => depth += 1,
                c if c == close && !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(idx + close.len_utf8());
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                let start = chars[start_pos].0;
                if let Ok(value) = serde_json::from_str(&text[start..end]) {
                    return Some(value);
                }
                search_from = start_pos + 1;
            }
            // Unbalanced to the end of the text; no later start can close.
            None => return None,
        }
    }
    None
}
