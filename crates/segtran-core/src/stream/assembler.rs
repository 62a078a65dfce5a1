//! Per-segment accumulation of streamed deltas

use crate::segmenter::{strip_markers, visible_text};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a consumer sees after one delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledDelta {
    pub index: usize,
    /// Newly revealed text, markers removed
    pub delta_clean: String,
    /// Everything revealed so far for this segment
    pub full_text: String,
}

#[derive(Debug, Default)]
pub struct StreamAssembler {
    buffers: BTreeMap<usize, String>,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw delta to segment `index`.
    ///
    /// Both the old and the new buffer are cleaned before diffing, so a marker
    /// that arrives in pieces is never emitted.
    pub fn push(&mut self, index: usize, delta: &str) -> AssembledDelta {
        let buffer = self.buffers.entry(index).or_default();
        let before = visible_text(buffer);
        buffer.push_str(delta);
        let after = visible_text(buffer);

        let delta_clean = match after.strip_prefix(before.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => {
                let common = before
                    .char_indices()
                    .zip(after.chars())
                    .find(|((_, a), b)| a != b)
                    .map(|((i, _), _)| i)
                    .unwrap_or(before.len().min(after.len()));
                after[common..].to_string()
            }
        };

        AssembledDelta {
            index,
            delta_clean,
            full_text: after,
        }
    }

    /// Segment indices that have received at least one delta
    pub fn indices(&self) -> Vec<usize> {
        self.buffers.keys().copied().collect()
    }

    /// Final cleaned text for `index`, releasing its buffer
    pub fn finish(&mut self, index: usize) -> Option<String> {
        self.buffers
            .remove(&index)
            .map(|buffer| strip_markers(&buffer).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_split_across_deltas_is_hidden() {
        let mut assembler = StreamAssembler::new();
        let deltas: Vec<String> = ["[Pa", "rt 2/", "3]\nThe ", "results"]
            .iter()
            .map(|d| assembler.push(1, d).delta_clean)
            .collect();
        assert_eq!(deltas, vec!["", "", "The ", "results"]);
        assert_eq!(assembler.finish(1).unwrap(), "The results");
    }

    #[test]
    fn test_segments_accumulate_independently() {
        let mut assembler = StreamAssembler::new();
        assembler.push(0, "alpha ");
        let second = assembler.push(2, "gamma");
        assembler.push(0, "beta");
        assert_eq!(second.full_text, "gamma");
        assert_eq!(assembler.indices(), vec![0, 2]);
        assert_eq!(assembler.finish(0).unwrap(), "alpha beta");
        assert_eq!(assembler.finish(0), None);
    }

    #[test]
    fn test_bracket_that_is_not_a_marker_is_released() {
        let mut assembler = StreamAssembler::new();
        assert_eq!(assembler.push(0, "see [").delta_clean, "see ");
        assert_eq!(assembler.push(0, "12]").delta_clean, "[12]");
    }
}
