//! Position markers prefixed to segments of a multi-segment job
//!
//! A marker looks like `[Part 3/7]` followed by a newline. Backends are asked to
//! leave it alone, and every piece of translated text passes through
//! [`strip_markers`] before it reaches the result store.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
static PARTIAL_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\[part\s*(\d+)\s*/\s*(\d+)\][ \t]*(?:\r?\n)?").unwrap()
    })
}

/// Matches an unfinished marker at the very end of a buffer (`[`, `[Pa`, `[Part 2/`).
fn partial_marker_regex() -> &'static Regex {
    PARTIAL_MARKER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\[(?:p(?:a(?:r(?:t(?:\s*\d*(?:\s*/\s*\d*)?)?)?)?)?)?$").unwrap()
    })
}

/// Render the marker for a zero-based `index` out of `total` segments
pub fn format_marker(index: usize, total: usize) -> String {
    format!("[Part {}/{}]\n", index + 1, total)
}

/// Remove every complete marker from `text`
pub fn strip_markers(text: &str) -> Cow<'_, str> {
    marker_regex().replace_all(text, "")
}

/// Parse the first marker in `text` into its 1-based `(index, total)` pair
pub fn parse_marker(text: &str) -> Option<(usize, usize)> {
    let caps = marker_regex().captures(text)?;
    let index = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((index, total))
}

/// Text safe to show from a growing buffer.
///
/// Complete markers are stripped and a trailing fragment that could still grow
/// into a marker is held back, so a marker split across deltas never leaks.
pub fn visible_text(buffer: &str) -> String {
    let stripped = strip_markers(buffer);
    match partial_marker_regex().find(&stripped) {
        Some(m) => stripped[..m.start()].to_string(),
        None => stripped.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_parse_roundtrip() {
        let marker = format_marker(2, 7);
        assert_eq!(marker, "[Part 3/7]\n");
        assert_eq!(parse_marker(&marker), Some((3, 7)));
    }

    #[test]
    fn test_strip_keeps_indentation() {
        let raw = format!("{}  缩进的段落", format_marker(0, 2));
        assert_eq!(strip_markers(&raw), "  缩进的段落");
    }

    #[test]
    fn test_strip_tolerates_model_rewrites() {
        assert_eq!(strip_markers("[part 1 / 3] Hello"), "Hello");
        assert_eq!(strip_markers("[PART 2/3]\r\nWorld"), "World");
        assert_eq!(strip_markers("no marker [Part] here"), "no marker [Part] here");
    }

    #[test]
    fn test_visible_text_holds_back_partial_marker() {
        assert_eq!(visible_text("[Pa"), "");
        assert_eq!(visible_text("[Part 1/"), "");
        assert_eq!(visible_text("[Part 1/2]\nHel"), "Hel");
        assert_eq!(visible_text("see [x"), "see [x");
        assert_eq!(visible_text("figure ["), "figure ");
    }
}
