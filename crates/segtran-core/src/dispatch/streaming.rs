//! Streaming dispatch: one open event stream at a time

use super::{report_progress, DispatchEngine, ProgressSink, SegmentOutcome};
use crate::error::SegmentError;
use crate::http::{ByteStream, CorrelationMeta, Transport};
use crate::store::ResultStore;
use crate::stream::{SseDecoder, SseEvent, StreamAssembler};
use crate::types::{OffsetRange, Segment, SegmentState};
use futures_util::StreamExt;
use tracing::Instrument;

/// Per-stream state threaded through event handling
struct StreamState<'a, P> {
    total: usize,
    current: usize,
    assembler: StreamAssembler,
    store: &'a mut ResultStore,
    offsets: &'a [OffsetRange],
    watermark: &'a mut usize,
    progress: &'a mut P,
}

pub(super) async fn run<T: Transport, P: ProgressSink>(
    engine: &DispatchEngine<T>,
    segments: &[Segment],
    offsets: &[OffsetRange],
    store: &mut ResultStore,
    indices: &[usize],
    progress: &mut P,
) -> Vec<SegmentOutcome> {
    let total = segments.len();
    let mut outcomes = Vec::with_capacity(indices.len());
    let mut watermark = store.watermark();

    for &index in indices {
        if !store.mark_pending(index) {
            continue;
        }
        let request = engine.request_for(&segments[index], total, offsets[index], true);

        let mut state = StreamState {
            total,
            current: index,
            assembler: StreamAssembler::new(),
            store: &mut *store,
            offsets,
            watermark: &mut watermark,
            progress: &mut *progress,
        };

        let result = async {
            let stream = engine
                .transport
                .open_stream(request)
                .await
                .map_err(|e| e.to_string())?;
            consume(engine, stream, &mut state).await
        }
        .instrument(tracing::debug_span!("stream", segment = index))
        .await;

        let mut settled = match result {
            Ok(settled) => settled,
            Err(message) => {
                tracing::warn!(segment = index, "stream failed: {}", message);
                if !state.store.set_error(SegmentError {
                    index,
                    attempts: 1,
                    message,
                }) {
                    tracing::warn!(segment = index, "slot already completed; error dropped");
                }
                vec![index]
            }
        };
        if super::fail_if_unsettled(state.store, index, 1) {
            settled.push(index);
        }
        settled.dedup();

        for slot in settled {
            report_progress(state.store, state.offsets, slot, state.watermark, state.progress);
            outcomes.push(SegmentOutcome {
                index: slot,
                state: state.store.state(slot).unwrap_or(SegmentState::Pending),
                attempts: 1,
                delays: Vec::new(),
            });
        }
    }

    outcomes
}

/// Drain one event stream. Returns the slots it completed, or an error
/// message when nothing usable arrived.
async fn consume<T: Transport, P: ProgressSink>(
    engine: &DispatchEngine<T>,
    mut stream: ByteStream,
    state: &mut StreamState<'_, P>,
) -> Result<Vec<usize>, String> {
    let mut decoder = SseDecoder::new();
    let mut failure = None;

    'read: while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for event in decoder.feed(&bytes) {
                    if let Err(message) = handle_event(engine, &event, state) {
                        failure = Some(message);
                        break 'read;
                    }
                }
            }
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        }
    }
    if failure.is_none() {
        if let Some(event) = decoder.finish() {
            if let Err(message) = handle_event(engine, &event, state) {
                failure = Some(message);
            }
        }
    }

    let received = state.assembler.indices();
    if received.is_empty() {
        return Err(failure.unwrap_or_else(|| "stream ended without content".to_string()));
    }
    if let Some(message) = failure {
        tracing::warn!("stream interrupted after partial content: {}", message);
    }

    let mut completed = Vec::with_capacity(received.len());
    for slot in received {
        let text = state.assembler.finish(slot).unwrap_or_default();
        if state.store.set_delta(slot, text, true) {
            completed.push(slot);
        } else {
            tracing::warn!(segment = slot, "slot already completed; streamed text dropped");
        }
    }
    Ok(completed)
}

fn handle_event<T: Transport, P: ProgressSink>(
    engine: &DispatchEngine<T>,
    event: &SseEvent,
    state: &mut StreamState<'_, P>,
) -> Result<(), String> {
    match event.kind() {
        "meta" => {
            match serde_json::from_str::<CorrelationMeta>(&event.data) {
                Ok(meta) if meta.segment_index < state.total => {
                    state.current = meta.segment_index;
                }
                Ok(meta) => tracing::warn!(
                    reported = meta.segment_index,
                    total = state.total,
                    "ignoring out-of-range meta event"
                ),
                Err(e) => tracing::warn!("unreadable meta event: {}", e),
            }
            Ok(())
        }
        "error" => Err(error_message(&event.data)),
        _ if event.is_done() => Ok(()),
        _ => {
            let delta = match engine.adapter.parse_stream_event(&event.data) {
                Ok(delta) => delta,
                Err(e) => {
                    tracing::warn!(segment = state.current, "skipping stream event: {}", e);
                    return Ok(());
                }
            };
            if delta.is_empty() {
                return Ok(());
            }

            let assembled = state.assembler.push(state.current, &delta);
            if state
                .store
                .set_delta(state.current, assembled.full_text.clone(), false)
            {
                state.progress.on_delta(&assembled);
                report_progress(
                    state.store,
                    state.offsets,
                    state.current,
                    state.watermark,
                    state.progress,
                );
            }
            Ok(())
        }
    }
}

/// Message carried by an `error` event, which may be a bare string or an envelope
fn error_message(data: &str) -> String {
    serde_json::from_str::<serde_json::Value>(data)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| data.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"success":false,"error":"upstream timeout","code":"TIMEOUT_ERROR"}"#),
            "upstream timeout"
        );
        assert_eq!(error_message(" plain failure \n"), "plain failure");
    }
}
