//! Text segmentation for long-document translation
//!
//! Splits a buffer into bounded segments along paragraph, sentence and finally
//! character boundaries. Consecutive small units are packed together so that
//! segments sit close to the size limit instead of trailing off into many
//! undersized requests.

pub mod marker;

use crate::types::Segment;
use regex::Regex;
use std::sync::OnceLock;

pub use marker::{format_marker, parse_marker, strip_markers, visible_text};

/// Default maximum segment size in characters
pub const DEFAULT_MAX_SEGMENT_CHARS: usize = 4000;

/// Separator placed between packed paragraphs and sentences
pub const UNIT_SEPARATOR: &str = "\n\n";

/// A buffer at or above this share of the limit is flushed immediately
const FLUSH_RATIO: f64 = 0.95;

/// Hard splits look for punctuation in this trailing share of the window
const BREAK_LOOKBACK_RATIO: f64 = 0.2;

/// Punctuation preferred as a hard-split point
const BREAK_PUNCTUATION: &[char] = &[
    '，', ',', '。', '.', '！', '!', '？', '?', ';', '；', ':', '：',
];

/// Punctuation that can end a sentence
const TERMINAL_MARKS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Closing quotes and brackets that stay attached to the sentence they end
const CLOSING_MARKS: &[char] = &['”', '’', '」', '』', '）', ')', '"', '\'', '》', '】'];

static PARAGRAPH_REGEX: OnceLock<Regex> = OnceLock::new();

fn paragraph_regex() -> &'static Regex {
    PARAGRAPH_REGEX.get_or_init(|| Regex::new(r"(?:\r?\n){2,}").unwrap())
}

/// Splits text into bounded [`Segment`]s
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_chars: usize,
    markers: bool,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEGMENT_CHARS)
    }
}

impl Segmenter {
    /// Create a segmenter with the given limit (clamped to at least one character)
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            markers: true,
        }
    }

    /// Disable position markers on multi-segment output
    pub fn without_markers(mut self) -> Self {
        self.markers = false;
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into an ordered, deterministic sequence of segments
    pub fn segment(&self, text: &str) -> Vec<Segment> {
        if text.chars().count() <= self.max_chars {
            return vec![Segment {
                index: 0,
                raw_text: text.to_string(),
                cleaned_text: text.to_string(),
            }];
        }

        let mut units = Vec::new();
        for paragraph in paragraph_regex().split(text) {
            if paragraph.trim().is_empty() {
                continue;
            }
            if paragraph.chars().count() <= self.max_chars {
                units.push(paragraph.to_string());
                continue;
            }
            for sentence in split_sentences(paragraph) {
                if sentence.chars().count() <= self.max_chars {
                    units.push(sentence.to_string());
                } else {
                    units.extend(hard_split(sentence, self.max_chars));
                }
            }
        }

        let bodies = self.pack(units);
        let total = bodies.len();
        let with_markers = self.markers && total > 1;

        bodies
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                let raw_text = if with_markers {
                    format!("{}{}", format_marker(index, total), body)
                } else {
                    body.clone()
                };
                Segment {
                    index,
                    raw_text,
                    cleaned_text: body,
                }
            })
            .collect()
    }

    /// Pack units into segment bodies joined by [`UNIT_SEPARATOR`]
    fn pack(&self, units: Vec<String>) -> Vec<String> {
        let separator_len = UNIT_SEPARATOR.chars().count();
        let flush_at = (self.max_chars as f64 * FLUSH_RATIO).ceil() as usize;

        let mut bodies = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for unit in units {
            let unit_len = unit.chars().count();
            if !buffer.is_empty() && buffer_len + separator_len + unit_len > self.max_chars {
                bodies.push(std::mem::take(&mut buffer));
                buffer_len = 0;
            }
            if !buffer.is_empty() {
                buffer.push_str(UNIT_SEPARATOR);
                buffer_len += separator_len;
            }
            buffer.push_str(&unit);
            buffer_len += unit_len;

            if buffer_len >= flush_at {
                bodies.push(std::mem::take(&mut buffer));
                buffer_len = 0;
            }
        }
        if !buffer.is_empty() {
            bodies.push(buffer);
        }
        bodies
    }
}

/// Convenience wrapper around [`Segmenter::segment`]
pub fn segment(text: &str, max_chars: usize) -> Vec<Segment> {
    Segmenter::new(max_chars).segment(text)
}

/// Split a paragraph after terminal punctuation.
///
/// `. ! ? 。！？` end a sentence only when whitespace or the end of the
/// paragraph follows. Closing quotes and repeated marks stay with the sentence
/// and are skipped before that check.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if !TERMINAL_MARKS.contains(&chars[i].1) {
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len()
            && (CLOSING_MARKS.contains(&chars[end].1) || TERMINAL_MARKS.contains(&chars[end].1))
        {
            end += 1;
        }
        let boundary = chars.get(end).map_or(true, |&(_, next)| next.is_whitespace());
        if !boundary {
            i = end;
            continue;
        }

        let end_byte = chars.get(end).map_or(paragraph.len(), |&(b, _)| b);
        let sentence = paragraph[start..end_byte].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end_byte;
        i = end;
    }

    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Hard-split an oversized sentence by character count
fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    let lookback_from = max_chars - (max_chars as f64 * BREAK_LOOKBACK_RATIO) as usize;
    let mut pieces = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let remaining = chars.len() - pos;
        if remaining <= max_chars {
            pieces.push(chars[pos..].iter().collect());
            break;
        }
        let window = &chars[pos..pos + max_chars];
        let cut = (lookback_from..max_chars)
            .rev()
            .find(|&i| BREAK_PUNCTUATION.contains(&window[i]))
            .map_or(max_chars, |i| i + 1);
        pieces.push(window[..cut].iter().collect());
        pos += cut;
    }
    pieces
}
