//! Output sanitizing: ANSI stripping and character truncation

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum characters of stdout kept in a result
pub const MAX_OUTPUT_CHARS: usize = 2000;

/// Maximum characters of stderr kept in a result
pub const MAX_ERROR_CHARS: usize = 1000;

/// Placeholder for a program that printed nothing
pub const NO_OUTPUT: &str = "(no output)";

/// 7-bit C1 escapes (`ESC @`..`ESC _`) and CSI sequences (`ESC [ ... final`)
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("ANSI escape pattern is valid")
});

/// Remove terminal control and cursor sequences
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Keep the first `max_chars` characters (not bytes)
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Sanitized stdout as exposed in a result
#[must_use]
pub fn clean_output(stdout: &str) -> String {
    let stripped = strip_ansi(stdout);
    if stripped.is_empty() {
        return NO_OUTPUT.to_string();
    }
    truncate_chars(&stripped, MAX_OUTPUT_CHARS).to_string()
}

/// Sanitized stderr as exposed in a result, `None` when empty
#[must_use]
pub fn clean_errors(stderr: &str) -> Option<String> {
    let stripped = strip_ansi(stderr);
    if stripped.is_empty() {
        return None;
    }
    Some(truncate_chars(&stripped, MAX_ERROR_CHARS).to_string())
}
