//! One translation request: segments, offsets and their result store

use crate::dispatch::{DispatchEngine, ProgressSink, SegmentOutcome};
use crate::error::SegmentError;
use crate::http::Transport;
use crate::offsets::compute_offsets;
use crate::segmenter::Segmenter;
use crate::store::ResultStore;
use crate::types::{OffsetRange, Segment, SegmentResult, SegmentState};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate state of a single translate-or-retry operation.
///
/// A new job replaces the old one; nothing is shared between jobs.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub(crate) id: String,
    pub(crate) original: String,
    pub(crate) segments: Vec<Segment>,
    pub(crate) offsets: Vec<OffsetRange>,
    pub(crate) store: ResultStore,
    pub(crate) started_at: DateTime<Utc>,
}

impl TranslationJob {
    /// Segment `text` and recover offsets. Blank input is rejected.
    pub fn new(text: impl Into<String>, max_chars: usize) -> Result<Self> {
        let original = text.into();
        if original.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let segments = Segmenter::new(max_chars).segment(&original);
        let offsets = compute_offsets(&original, &segments);
        let started_at = Utc::now();
        let id = format!("job-{}", started_at.format("%Y%m%d%H%M%S%3f"));

        tracing::debug!(
            job_id = %id,
            segments = segments.len(),
            chars = original.chars().count(),
            max_chars,
            "job created"
        );

        Ok(Self {
            id,
            store: ResultStore::new(segments.len()),
            original,
            segments,
            offsets,
            started_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn offsets(&self) -> &[OffsetRange] {
        &self.offsets
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn errors(&self) -> &[SegmentError] {
        self.store.errors()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Source text a segment was recovered from
    pub fn source_span(&self, index: usize) -> Option<&str> {
        self.offsets.get(index).map(|range| range.slice(&self.original))
    }

    /// Joined output of every slot in index order
    pub fn output(&self) -> String {
        self.store.join_in_order()
    }

    /// Indices that ended in the error state
    pub fn failed_indices(&self) -> Vec<usize> {
        self.store.indices_in(SegmentState::Error)
    }

    /// Translate every segment with `engine`
    pub async fn translate<T: Transport, P: ProgressSink>(
        &mut self,
        engine: &DispatchEngine<T>,
        progress: &mut P,
    ) -> Result<Vec<SegmentOutcome>> {
        engine.translate(self, progress).await
    }

    /// Re-dispatch only the failed segments; completed slots are untouched
    pub async fn retry_failed<T: Transport, P: ProgressSink>(
        &mut self,
        engine: &DispatchEngine<T>,
        progress: &mut P,
    ) -> Result<Vec<SegmentOutcome>> {
        engine.retry_failed(self, progress).await
    }

    /// Serializable summary of the job
    pub fn report(&self) -> JobReport {
        let finished_at = Utc::now();
        JobReport {
            id: self.id.clone(),
            text: self.store.join_in_order(),
            total: self.store.total(),
            completed: self.store.completed_count(),
            failed: self.store.error_count(),
            segments: self.store.results(),
            offsets: self.offsets.clone(),
            errors: self.store.errors().to_vec(),
            started_at: self.started_at,
            finished_at,
            elapsed_ms: (finished_at - self.started_at).num_milliseconds().max(0) as u64,
        }
    }
}

/// Summary of a finished (or partially finished) job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub id: String,
    pub text: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub segments: Vec<SegmentResult>,
    pub offsets: Vec<OffsetRange>,
    pub errors: Vec<SegmentError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}
