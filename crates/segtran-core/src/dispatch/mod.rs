//! Dispatch engine
//!
//! Sends one request per segment through a [`Transport`], a batch of
//! `concurrency` segments at a time. Every request in a batch is in flight at
//! once on the current task; the next batch starts only after the whole batch
//! has settled. Results are written to the job's [`ResultStore`] as they
//! arrive, in whatever order the network delivers them.

mod streaming;

use crate::backend::BackendAdapter;
use crate::error::SegmentError;
use crate::http::{
    execute_with_retry, CorrelationMeta, ProxyRequest, RetryPolicy, Retryable, Transport,
    TransportError,
};
use crate::job::TranslationJob;
use crate::segmenter::strip_markers;
use crate::store::ResultStore;
use crate::stream::AssembledDelta;
use crate::types::{OffsetRange, Progress, ProgressStats, Segment, SegmentState};
use crate::{Error, Result};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::time::Duration;
use tracing::Instrument;

/// Receiver of progress reports.
///
/// Any `FnMut(&Progress)` closure is a sink; implement the trait directly to
/// also see streamed deltas.
pub trait ProgressSink {
    /// Called after every segment state change
    fn on_progress(&mut self, progress: &Progress);

    /// Called for every streamed delta, before the matching progress report
    fn on_delta(&mut self, _delta: &AssembledDelta) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&Progress),
{
    fn on_progress(&mut self, progress: &Progress) {
        self(progress)
    }
}

/// Per-job dispatch options
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// In-flight request limit; the backend profile's limit when unset
    pub concurrency: Option<usize>,
    pub retry: RetryPolicy,
    /// Replaces the default system prompt when non-blank
    pub custom_prompt: Option<String>,
    /// Use the streaming endpoint, one segment at a time
    pub streaming: bool,
    /// Per-request deadline; the backend profile's timeout when unset
    pub request_timeout: Option<Duration>,
}

impl JobOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// How one segment dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutcome {
    /// Slot the result was recorded under
    pub index: usize,
    pub state: SegmentState,
    /// Requests made, including the first
    pub attempts: u32,
    /// Backoff delays actually waited
    pub delays: Vec<Duration>,
}

/// Failure of a single attempt
#[derive(Debug)]
enum AttemptError {
    Transport(TransportError),
    Parse(Error),
}

impl Retryable for AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Transport(e) => e.is_transient(),
            AttemptError::Parse(_) => false,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "{}", e),
            AttemptError::Parse(e) => write!(f, "{}", e),
        }
    }
}

pub struct DispatchEngine<T> {
    transport: T,
    adapter: Box<dyn BackendAdapter>,
    options: JobOptions,
}

impl<T: Transport> DispatchEngine<T> {
    pub fn new(transport: T, adapter: Box<dyn BackendAdapter>) -> Self {
        Self {
            transport,
            adapter,
            options: JobOptions::default(),
        }
    }

    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn adapter(&self) -> &dyn BackendAdapter {
        self.adapter.as_ref()
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Effective in-flight limit
    pub fn concurrency(&self) -> usize {
        self.options
            .concurrency
            .unwrap_or_else(|| self.adapter.profile().concurrency_limit)
            .max(1)
    }

    /// Effective per-request deadline
    pub fn request_timeout(&self) -> Duration {
        self.options
            .request_timeout
            .unwrap_or_else(|| self.adapter.profile().request_timeout)
    }

    /// Translate every segment of `job`.
    ///
    /// Segment failures are recorded in the store; only a job in which every
    /// segment failed returns [`Error::AllSegmentsFailed`].
    pub async fn translate<P: ProgressSink>(
        &self,
        job: &mut TranslationJob,
        progress: &mut P,
    ) -> Result<Vec<SegmentOutcome>> {
        let indices: Vec<usize> = (0..job.segments.len()).collect();
        self.dispatch(job, &indices, progress).await
    }

    /// Dispatch again only the segments that ended in error
    pub async fn retry_failed<P: ProgressSink>(
        &self,
        job: &mut TranslationJob,
        progress: &mut P,
    ) -> Result<Vec<SegmentOutcome>> {
        let failed = job.store.indices_in(SegmentState::Error);
        if failed.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!(job_id = %job.id, segments = failed.len(), "retrying failed segments");
        job.store.clear_errors_for(&failed);
        self.dispatch(job, &failed, progress).await
    }

    async fn dispatch<P: ProgressSink>(
        &self,
        job: &mut TranslationJob,
        indices: &[usize],
        progress: &mut P,
    ) -> Result<Vec<SegmentOutcome>> {
        let span = tracing::info_span!(
            "dispatch",
            job_id = %job.id,
            model = %self.adapter.model(),
            streaming = self.options.streaming
        );

        let TranslationJob {
            segments,
            offsets,
            store,
            ..
        } = job;

        let outcomes = if self.options.streaming {
            streaming::run(self, segments, offsets, store, indices, progress)
                .instrument(span)
                .await
        } else {
            self.run_batches(segments, offsets, store, indices, progress)
                .instrument(span)
                .await
        };

        if store.all_failed() {
            return Err(Error::AllSegmentsFailed {
                total: store.total(),
                errors: store.errors().to_vec(),
            });
        }
        Ok(outcomes)
    }

    async fn run_batches<P: ProgressSink>(
        &self,
        segments: &[Segment],
        offsets: &[OffsetRange],
        store: &mut ResultStore,
        indices: &[usize],
        progress: &mut P,
    ) -> Vec<SegmentOutcome> {
        let total = segments.len();
        let mut outcomes = Vec::with_capacity(indices.len());
        let mut watermark = store.watermark();

        for batch in indices.chunks(self.concurrency()) {
            let mut in_flight = FuturesUnordered::new();
            let mut dispatched = Vec::with_capacity(batch.len());
            for &index in batch {
                if !store.mark_pending(index) {
                    continue;
                }
                dispatched.push((index, 0u32));
                let request = self.request_for(&segments[index], total, offsets[index], false);
                in_flight.push(
                    self.attempt_segment(index, request)
                        .instrument(tracing::debug_span!("segment", segment = index)),
                );
            }

            while let Some((index, result, report)) = in_flight.next().await {
                if let Some(entry) = dispatched.iter_mut().find(|(i, _)| *i == index) {
                    entry.1 = report.attempts;
                }
                let slot = match result {
                    Ok((text, meta)) => {
                        let slot = match meta.map(|m| m.segment_index) {
                            Some(reported) if reported < total => reported,
                            Some(reported) => {
                                tracing::warn!(
                                    segment = index,
                                    reported,
                                    total,
                                    "ignoring out-of-range echoed index"
                                );
                                index
                            }
                            None => index,
                        };
                        if slot != index {
                            tracing::debug!(segment = index, reported = slot, "using echoed index");
                        }
                        let clean = strip_markers(&text).trim().to_string();
                        if !store.set_delta(slot, clean, true) {
                            tracing::warn!(segment = slot, "slot already completed; result dropped");
                        }
                        slot
                    }
                    Err(error) => {
                        store.set_error(SegmentError {
                            index,
                            attempts: report.attempts,
                            message: error.to_string(),
                        });
                        index
                    }
                };

                outcomes.push(SegmentOutcome {
                    index: slot,
                    state: store.state(slot).unwrap_or(SegmentState::Pending),
                    attempts: report.attempts,
                    delays: report.delays,
                });
                report_progress(store, offsets, slot, &mut watermark, progress);
            }

            for (index, attempts) in dispatched {
                if fail_if_unsettled(store, index, attempts) {
                    outcomes.push(SegmentOutcome {
                        index,
                        state: SegmentState::Error,
                        attempts,
                        delays: Vec::new(),
                    });
                    report_progress(store, offsets, index, &mut watermark, progress);
                }
            }
        }

        outcomes
    }

    fn request_for(
        &self,
        segment: &Segment,
        total: usize,
        offset: OffsetRange,
        streaming: bool,
    ) -> ProxyRequest {
        ProxyRequest {
            endpoint: self.adapter.endpoint(streaming),
            payload: self
                .adapter
                .build_request(&segment.raw_text, self.options.custom_prompt.as_deref()),
            meta: CorrelationMeta {
                segment_index: segment.index,
                total,
                offset,
            },
            timeout: self.request_timeout(),
        }
    }

    async fn attempt_segment(
        &self,
        index: usize,
        request: ProxyRequest,
    ) -> (
        usize,
        std::result::Result<(String, Option<CorrelationMeta>), AttemptError>,
        crate::http::RetryReport,
    ) {
        let (result, report) = execute_with_retry(
            |attempt| {
                let request = request.clone();
                async move {
                    tracing::debug!(attempt, "sending segment");
                    let reply = self
                        .transport
                        .send(request)
                        .await
                        .map_err(AttemptError::Transport)?;
                    let text = self
                        .adapter
                        .parse_response(&reply.data)
                        .map_err(AttemptError::Parse)?;
                    Ok::<_, AttemptError>((text, reply.meta))
                }
            },
            &self.options.retry,
        )
        .await;

        match &result {
            Ok(_) => tracing::info!(segment = index, attempts = report.attempts, "segment completed"),
            Err(e) => tracing::warn!(segment = index, attempts = report.attempts, "segment failed: {}", e),
        }
        (index, result, report)
    }
}

/// Fail a dispatched slot that no reply settled, which happens when an echoed
/// index routed its result elsewhere. Returns true when the slot was failed.
pub(super) fn fail_if_unsettled(store: &mut ResultStore, index: usize, attempts: u32) -> bool {
    if store.state(index).map_or(false, |state| state.is_settled()) {
        return false;
    }
    tracing::warn!(segment = index, "no result landed in dispatched slot");
    store.set_error(SegmentError {
        index,
        attempts,
        message: "no result received; the reply was attributed to another segment".to_string(),
    })
}

/// Snapshot of the store for progress reporting
pub fn progress_snapshot(store: &ResultStore, offsets: &[OffsetRange], last_index: usize) -> Progress {
    Progress {
        text: store.join_through_watermark(),
        watermark: store.watermark(),
        stats: ProgressStats {
            completed: store.completed_count(),
            total: store.total(),
            last_chunk_index: last_index,
            offsets: offsets.to_vec(),
        },
    }
}

fn report_progress<P: ProgressSink>(
    store: &ResultStore,
    offsets: &[OffsetRange],
    last_index: usize,
    watermark: &mut usize,
    progress: &mut P,
) {
    let snapshot = progress_snapshot(store, offsets, last_index);
    if snapshot.watermark != *watermark {
        tracing::debug!(from = *watermark, to = snapshot.watermark, "watermark advanced");
        *watermark = snapshot.watermark;
    }
    progress.on_progress(&snapshot);
}
