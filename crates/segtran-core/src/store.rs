//! Index-addressed store of segment results
//!
//! One slot per segment. A slot that reaches `Completed` is frozen for the rest
//! of the job; every later write to it is ignored.

use crate::error::SegmentError;
use crate::segmenter::UNIT_SEPARATOR;
use crate::types::{SegmentResult, SegmentState};

/// Text recorded in a slot whose segment could not be translated
pub fn failure_placeholder(index: usize) -> String {
    format!("[Translation failed for segment {}]", index + 1)
}

#[derive(Debug, Clone, Default)]
struct Slot {
    content: String,
    state: Option<SegmentState>,
}

/// Result slots plus the job's accumulated error records
#[derive(Debug, Clone)]
pub struct ResultStore {
    slots: Vec<Slot>,
    errors: Vec<SegmentError>,
}

impl ResultStore {
    /// Create a store with `total` unset slots
    pub fn new(total: usize) -> Self {
        Self {
            slots: vec![Slot::default(); total],
            errors: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    fn writable(&mut self, index: usize) -> Option<&mut Slot> {
        let total = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) if slot.state == Some(SegmentState::Completed) => None,
            Some(slot) => Some(slot),
            None => {
                tracing::warn!(index, total, "write to out-of-range slot ignored");
                None
            }
        }
    }

    /// Reset a slot to `Pending` as dispatch begins. Returns false for completed slots.
    pub fn mark_pending(&mut self, index: usize) -> bool {
        match self.writable(index) {
            Some(slot) => {
                slot.content.clear();
                slot.state = Some(SegmentState::Pending);
                true
            }
            None => false,
        }
    }

    /// Overwrite a slot's content. No-op once the slot is `Completed`.
    pub fn set_delta(&mut self, index: usize, content: impl Into<String>, is_final: bool) -> bool {
        match self.writable(index) {
            Some(slot) => {
                slot.content = content.into();
                slot.state = Some(if is_final {
                    SegmentState::Completed
                } else {
                    SegmentState::Streaming
                });
                true
            }
            None => false,
        }
    }

    /// Mark a slot failed and record the error. No-op once the slot is `Completed`.
    pub fn set_error(&mut self, error: SegmentError) -> bool {
        let index = error.index;
        match self.writable(index) {
            Some(slot) => {
                slot.content = failure_placeholder(index);
                slot.state = Some(SegmentState::Error);
                self.errors.push(error);
                true
            }
            None => false,
        }
    }

    /// Snapshot of one slot, available before the watermark reaches it
    pub fn get(&self, index: usize) -> Option<SegmentResult> {
        self.slots.get(index).map(|slot| SegmentResult {
            index,
            content: slot.content.clone(),
            state: slot.state,
        })
    }

    pub fn state(&self, index: usize) -> Option<SegmentState> {
        self.slots.get(index).and_then(|slot| slot.state)
    }

    /// Snapshots of every slot in index order
    pub fn results(&self) -> Vec<SegmentResult> {
        (0..self.slots.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Indices currently in the given state
    pub fn indices_in(&self, state: SegmentState) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == Some(state))
            .map(|(i, _)| i)
            .collect()
    }

    fn join(&self, upto: usize) -> String {
        let separator = if self.slots.len() > 1 { UNIT_SEPARATOR } else { "" };
        self.slots[..upto]
            .iter()
            .map(|slot| slot.content.as_str())
            .collect::<Vec<_>>()
            .join(separator)
            .trim()
            .to_string()
    }

    /// All slots in index order, unset slots as empty strings
    pub fn join_in_order(&self) -> String {
        self.join(self.slots.len())
    }

    /// Number of leading slots that are settled (`Completed` or `Error`)
    pub fn watermark(&self) -> usize {
        self.slots
            .iter()
            .take_while(|slot| slot.state.map_or(false, |s| s.is_settled()))
            .count()
    }

    /// Joined text of the settled prefix
    pub fn join_through_watermark(&self) -> String {
        self.join(self.watermark())
    }

    pub fn completed_count(&self) -> usize {
        self.indices_in(SegmentState::Completed).len()
    }

    pub fn error_count(&self) -> usize {
        self.indices_in(SegmentState::Error).len()
    }

    /// True when the job has segments and every one of them failed
    pub fn all_failed(&self) -> bool {
        !self.slots.is_empty() && self.error_count() == self.slots.len()
    }

    pub fn errors(&self) -> &[SegmentError] {
        &self.errors
    }

    /// Drop error records for segments about to be dispatched again
    pub fn clear_errors_for(&mut self, indices: &[usize]) {
        self.errors.retain(|e| !indices.contains(&e.index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: usize) -> SegmentError {
        SegmentError {
            index,
            attempts: 4,
            message: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_completed_slot_is_frozen() {
        let mut store = ResultStore::new(2);
        assert!(store.set_delta(0, "final", true));

        assert!(!store.set_delta(0, "overwrite", true));
        assert!(!store.set_delta(0, "partial", false));
        assert!(!store.set_error(failure(0)));
        assert!(!store.mark_pending(0));

        let slot = store.get(0).unwrap();
        assert_eq!(slot.content, "final");
        assert_eq!(slot.state, Some(SegmentState::Completed));
        assert!(store.errors().is_empty());
    }

    #[test]
    fn test_single_slot_join_has_no_separator() {
        let mut store = ResultStore::new(1);
        store.set_delta(0, "  only one  ", true);
        assert_eq!(store.join_in_order(), "only one");
    }

    #[test]
    fn test_three_slot_join() {
        let mut store = ResultStore::new(3);
        store.set_delta(2, "c", true);
        store.set_delta(0, "a", true);
        store.set_delta(1, "b", true);
        assert_eq!(store.join_in_order(), "a\n\nb\n\nc");
        assert_eq!(store.completed_count(), 3);
    }

    #[test]
    fn test_unset_slots_render_empty() {
        let mut store = ResultStore::new(3);
        store.set_delta(1, "middle", true);
        assert_eq!(store.join_in_order(), "middle");
        assert_eq!(store.get(0).unwrap().state, None);
    }

    #[test]
    fn test_watermark_waits_for_lower_indices() {
        let mut store = ResultStore::new(3);
        store.set_delta(2, "late", true);
        assert_eq!(store.watermark(), 0);
        assert_eq!(store.join_through_watermark(), "");
        assert_eq!(store.get(2).unwrap().content, "late");

        store.set_delta(0, "first", true);
        assert_eq!(store.watermark(), 1);
        assert_eq!(store.join_through_watermark(), "first");

        store.set_error(failure(1));
        assert_eq!(store.watermark(), 3);
        assert_eq!(
            store.join_through_watermark(),
            "first\n\n[Translation failed for segment 2]\n\nlate"
        );
    }

    #[test]
    fn test_streaming_then_final() {
        let mut store = ResultStore::new(1);
        store.mark_pending(0);
        store.set_delta(0, "Hel", false);
        assert_eq!(store.state(0), Some(SegmentState::Streaming));
        assert_eq!(store.watermark(), 0);
        store.set_delta(0, "Hello", true);
        assert_eq!(store.state(0), Some(SegmentState::Completed));
    }

    #[test]
    fn test_all_failed_and_error_bookkeeping() {
        let mut store = ResultStore::new(2);
        store.set_error(failure(0));
        assert!(!store.all_failed());
        store.set_error(failure(1));
        assert!(store.all_failed());
        assert_eq!(store.errors().len(), 2);

        store.clear_errors_for(&[1]);
        assert_eq!(store.errors().len(), 1);
        assert!(store.mark_pending(1));
        assert_eq!(store.state(1), Some(SegmentState::Pending));
        assert_eq!(store.get(1).unwrap().content, "");
    }

    #[test]
    fn test_out_of_range_writes_are_ignored() {
        let mut store = ResultStore::new(1);
        assert!(!store.set_delta(5, "nope", true));
        assert!(!ResultStore::new(0).all_failed());
    }
}
