//! Final-answer sanitizer.
//!
//! The model is told not to emit query code, tags, or error echoes, but
//! models drift; this pass guarantees the channel only ever carries clean
//! prose of bounded length, and never an empty message.

use {once_cell::sync::Lazy, regex::Regex};

use crate::phrases::FALLBACK_ANSWER;

/// Cleaned answers shorter than this are considered degenerate.
const MIN_ANSWER_CHARS: usize = 20;

static FENCED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)```[a-zA-Z0-9_-]*\n?.*?```").expect("fence pattern")
});

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"</?[a-zA-Z][^>\n]{0,80}>").expect("tag pattern")
});

static ERROR_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)^\s*erro?r?:.*$").expect("error line pattern")
});

static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\n{3,}").expect("blank run pattern")
});

/// Sanitize a final answer and bound it to `max_chars`.
#[must_use]
pub fn sanitize_response(text: &str, max_chars: usize) -> String {
    let cleaned = FENCED_BLOCK_RE.replace_all(text, "");
    let cleaned = HTML_TAG_RE.replace_all(&cleaned, "");
    let cleaned = ERROR_LINE_RE.replace_all(&cleaned, "");
    let cleaned = BLANK_RUN_RE.replace_all(&cleaned, "\n\n");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() < MIN_ANSWER_CHARS {
        return FALLBACK_ANSWER.to_string();
    }

    if cleaned.chars().count() <= max_chars {
        return cleaned.to_string();
    }

    let mut truncated: String = cleaned.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
