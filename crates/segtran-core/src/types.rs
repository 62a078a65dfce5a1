//! Core data types shared by the segmentation and dispatch pipeline

use serde::{Deserialize, Serialize};

/// A bounded slice of the source text, translated independently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Zero-based position in the segment sequence
    pub index: usize,
    /// Text as sent to the backend, including the position marker if any
    pub raw_text: String,
    /// `raw_text` with the position marker stripped
    pub cleaned_text: String,
}

impl Segment {
    /// Number of characters in the cleaned text
    pub fn char_len(&self) -> usize {
        self.cleaned_text.chars().count()
    }
}

/// Half-open `[start, end)` span of character positions in the original text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OffsetRange {
    pub start: usize,
    pub end: usize,
}

impl OffsetRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extract the covered characters from `original`
    pub fn slice<'a>(&self, original: &'a str) -> &'a str {
        let mut indices = original
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(original.len()));
        let start = indices.nth(self.start).unwrap_or(original.len());
        let end = if self.end > self.start {
            indices.nth(self.end - self.start - 1).unwrap_or(original.len())
        } else {
            start
        };
        &original[start..end]
    }
}

/// Lifecycle state of one result slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentState {
    /// Dispatch started, nothing received yet
    Pending,
    /// At least one streamed delta received
    Streaming,
    /// Final content recorded; frozen
    Completed,
    /// Retries exhausted without content
    Error,
}

impl SegmentState {
    /// Whether the slot will not change again within the current attempt
    pub fn is_settled(&self) -> bool {
        matches!(self, SegmentState::Completed | SegmentState::Error)
    }
}

/// Snapshot of one slot of the result store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub index: usize,
    pub content: String,
    /// `None` while the slot is still unset
    pub state: Option<SegmentState>,
}

/// Counters handed to the progress callback after every state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    /// Slots in the `Completed` state
    pub completed: usize,
    /// Total number of segments in the job
    pub total: usize,
    /// Index of the segment whose change triggered this report
    pub last_chunk_index: usize,
    /// Recovered source ranges, one per segment
    pub offsets: Vec<OffsetRange>,
}

/// Progress report: in-order text through the watermark plus counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Joined output of every slot below the watermark
    pub text: String,
    /// Number of contiguous settled slots from index 0
    pub watermark: usize,
    pub stats: ProgressStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_slice_uses_char_positions() {
        let original = "第一段。\n\n第二段。";
        let range = OffsetRange::new(6, 10);
        assert_eq!(range.slice(original), "第二段。");
        assert_eq!(OffsetRange::new(0, 4).slice(original), "第一段。");
    }

    #[test]
    fn test_offset_slice_out_of_bounds_clamps() {
        let original = "abc";
        assert_eq!(OffsetRange::new(1, 10).slice(original), "bc");
        assert_eq!(OffsetRange::new(5, 5).slice(original), "");
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SegmentState::Streaming).unwrap();
        assert_eq!(json, "\"streaming\"");
        assert!(SegmentState::Error.is_settled());
        assert!(!SegmentState::Pending.is_settled());
    }
}
