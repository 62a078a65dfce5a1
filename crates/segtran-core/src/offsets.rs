//! Recovery of source offsets for segments
//!
//! Segmentation normalizes whitespace between paragraphs and sentences, so a
//! segment is not a verbatim slice of the original. Each segment is located by
//! searching for a short probe of its leading text, walking forward through the
//! original so that recovered ranges never move backwards.

use crate::types::{OffsetRange, Segment};

/// Maximum number of characters used as a search probe
pub const PROBE_CHARS: usize = 50;

/// The next segment is searched for only past this share of the current one
const LOOKAHEAD_RATIO: f64 = 0.5;

/// Byte/character position lookup for one string
struct CharIndex<'a> {
    text: &'a str,
    byte_offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        let byte_offsets = text.char_indices().map(|(i, _)| i).collect();
        Self { text, byte_offsets }
    }

    fn char_len(&self) -> usize {
        self.byte_offsets.len()
    }

    fn to_byte(&self, char_pos: usize) -> usize {
        self.byte_offsets
            .get(char_pos)
            .copied()
            .unwrap_or(self.text.len())
    }

    fn to_char(&self, byte_pos: usize) -> usize {
        match self.byte_offsets.binary_search(&byte_pos) {
            Ok(i) | Err(i) => i,
        }
    }

    fn char_at(&self, char_pos: usize) -> Option<char> {
        self.text[self.to_byte(char_pos)..].chars().next()
    }

    /// Character position of the first occurrence of `needle` at or after `from`
    fn find_from(&self, needle: &str, from: usize) -> Option<usize> {
        if needle.is_empty() || from > self.char_len() {
            return None;
        }
        let from_byte = self.to_byte(from);
        self.text[from_byte..]
            .find(needle)
            .map(|found| self.to_char(from_byte + found))
    }
}

/// Leading probe of a segment: its first characters, trimmed
fn probe(segment: &Segment) -> String {
    segment
        .cleaned_text
        .chars()
        .take(PROBE_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Recover one `[start, end)` character range per segment, in segment order.
///
/// Ranges are in bounds and non-decreasing in `start`; each range ends where the
/// next one's probe is found, or after the segment's own length if it is not.
/// Same-line indentation in front of a probe match is pulled into the range,
/// which may overlap the tail of the previous range.
pub fn compute_offsets(original: &str, segments: &[Segment]) -> Vec<OffsetRange> {
    let index = CharIndex::new(original);
    let total = index.char_len();
    let mut ranges = Vec::with_capacity(segments.len());
    let mut cursor = 0usize;
    let mut previous_start = 0usize;

    for (i, segment) in segments.iter().enumerate() {
        let start = match index.find_from(&probe(segment), cursor) {
            Some(found) => {
                let mut start = found;
                while start > previous_start {
                    match index.char_at(start - 1) {
                        Some(c) if c.is_whitespace() && c != '\n' => start -= 1,
                        _ => break,
                    }
                }
                start
            }
            None => cursor,
        };

        let segment_len = segment.char_len();
        let end = if i + 1 == segments.len() {
            total
        } else {
            let lookahead = start + (segment_len as f64 * LOOKAHEAD_RATIO) as usize;
            index
                .find_from(&probe(&segments[i + 1]), lookahead.min(total))
                .unwrap_or(start + segment_len)
        };
        let end = end.clamp(start, total);

        ranges.push(OffsetRange::new(start, end));
        previous_start = start;
        cursor = end;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::Segmenter;

    fn assert_well_formed(original: &str, ranges: &[OffsetRange]) {
        let total = original.chars().count();
        let mut previous_start = 0;
        for range in ranges {
            assert!(range.start <= range.end, "{:?}", range);
            assert!(range.end <= total, "{:?} exceeds {}", range, total);
            assert!(range.start >= previous_start);
            previous_start = range.start;
        }
    }

    #[test]
    fn test_single_segment_covers_everything() {
        let original = "  完整的文本。";
        let segments = Segmenter::new(100).segment(original);
        let ranges = compute_offsets(original, &segments);
        assert_eq!(ranges, vec![OffsetRange::new(0, original.chars().count())]);
    }

    #[test]
    fn test_paragraph_segments_map_back() {
        let first = "甲".repeat(30);
        let second = "乙".repeat(30);
        let third = "丙".repeat(30);
        let original = format!("{}\n\n{}\n\n\n{}", first, second, third);
        let segments = Segmenter::new(40).segment(&original);
        assert_eq!(segments.len(), 3);

        let ranges = compute_offsets(&original, &segments);
        assert_eq!(ranges[0], OffsetRange::new(0, 32));
        assert_eq!(ranges[1], OffsetRange::new(32, 65));
        assert_eq!(ranges[2], OffsetRange::new(65, 95));
        assert_eq!(ranges[1].slice(&original).trim(), second);
        assert_well_formed(&original, &ranges);
    }

    #[test]
    fn test_indentation_is_recovered() {
        let original = format!("{}\n\n    {}", "甲".repeat(30), "乙".repeat(30));
        let segments = Segmenter::new(40).segment(&original);
        let ranges = compute_offsets(&original, &segments);
        assert_eq!(ranges[1].start, 32);
        assert!(ranges[1].slice(&original).starts_with("    乙"));
    }

    #[test]
    fn test_missing_probe_falls_back_to_cursor() {
        let original = "abcdefghij";
        let segments = vec![
            Segment {
                index: 0,
                raw_text: "abc".to_string(),
                cleaned_text: "abc".to_string(),
            },
            Segment {
                index: 1,
                raw_text: "zzz".to_string(),
                cleaned_text: "zzz".to_string(),
            },
            Segment {
                index: 2,
                raw_text: "hij".to_string(),
                cleaned_text: "hij".to_string(),
            },
        ];
        let ranges = compute_offsets(original, &segments);
        assert_eq!(ranges[0], OffsetRange::new(0, 3));
        assert_eq!(ranges[1], OffsetRange::new(3, 7));
        assert_eq!(ranges[2], OffsetRange::new(7, 10));
        assert_well_formed(original, &ranges);
    }

    #[test]
    fn test_ranges_stay_in_bounds_for_foreign_segments() {
        let original = "short";
        let segments = vec![
            Segment {
                index: 0,
                raw_text: "unrelated text that is long".to_string(),
                cleaned_text: "unrelated text that is long".to_string(),
            },
            Segment {
                index: 1,
                raw_text: "more".to_string(),
                cleaned_text: "more".to_string(),
            },
        ];
        let ranges = compute_offsets(original, &segments);
        assert_well_formed(original, &ranges);
        assert_eq!(ranges[0], OffsetRange::new(0, 5));
        assert_eq!(ranges[1], OffsetRange::new(5, 5));
    }
}
