//! JSON extraction from free-form LLM responses.
//!
//! Models asked for JSON frequently wrap it in markdown fences or
//! explanatory prose. [`extract_json`] tries, in order:
//!
//! 1. The trimmed content itself, when it starts with `{` or `[`
//! 2. The body of a fenced code block (```json or plain ```)
//! 3. The first balanced `{...}` or `[...]` span anywhere in the text
//!
//! Returning `None` means no balanced JSON-like span was found; callers
//! fall back to their own heuristics.

use std::sync::OnceLock;

use regex::Regex;

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)```").expect("fence pattern is valid")
    })
}

/// Extracts the first JSON object or array from mixed content.
pub fn extract_json(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Some(span) = balanced_span(trimmed) {
            return Some(span);
        }
    }

    if let Some(captures) = fence_pattern().captures(content) {
        let body = captures.get(1)?.as_str().trim();
        if let Some(span) = balanced_span(body) {
            return Some(span);
        }
    }

    let start = content.find(['{', '['])?;
    balanced_span(&content[start..])
}

/// Returns the shortest balanced `{...}`/`[...]` prefix of `content`,
/// tracking string literals and escapes so braces inside strings do not
/// affect the depth count.
fn balanced_span(content: &str) -> Option<String> {
    let (open, close) = match content.chars().next()? {
        '{' => ('{', '}'),
        '[' => ('[', ']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in content.char_indices() {
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

        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(content[..=idx].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
