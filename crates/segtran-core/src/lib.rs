//! Segtran Core - segmented translation of long Chinese academic text
//!
//! Long documents are split into bounded segments, each segment is translated
//! through a proxy by one of several model backends, and the results are
//! reassembled in source order with a mapping back to the original offsets.
//!
//! # Main Components
//!
//! - **Segmenter**: paragraph, sentence and hard splits with position markers
//! - **Offset recovery**: `[start, end)` source ranges per segment
//! - **Dispatch**: bounded-concurrency requests with fixed-delay retry
//! - **Streaming**: SSE decoding and marker-safe delta assembly
//! - **Result store**: index-addressed slots with an in-order watermark
//!
//! # Example
//!
//! ```no_run
//! use segtran_core::{ProxyClient, ProxyClientConfig, JobOptions, Result};
//!
//! async fn example() -> Result<()> {
//!     let client = ProxyClient::new(ProxyClientConfig::new("http://localhost:3000"))?;
//!     let job = segtran_core::translate_text(client, "deepseek", "待翻译的文本。", JobOptions::default()).await?;
//!     println!("{}", job.output());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod http;
pub mod job;
pub mod offsets;
pub mod segmenter;
pub mod store;
pub mod stream;
pub mod types;

// Re-export main types for convenience
pub use backend::{adapter_for, resolve, BackendAdapter, BackendProfile, ModelId};
pub use dispatch::{DispatchEngine, JobOptions, ProgressSink, SegmentOutcome};
pub use document::{extract_document, extract_text, DocumentExtractor, Extracted, PlainTextExtractor};
pub use error::{Error, Result, SegmentError};
pub use http::{
    ProxyClient, ProxyClientConfig, RetryPolicy, Transport, TransportError, TransportErrorKind,
};
pub use job::{JobReport, TranslationJob};
pub use offsets::compute_offsets;
pub use segmenter::{segment, Segmenter};
pub use store::ResultStore;
pub use stream::{AssembledDelta, StreamAssembler};
pub use types::{OffsetRange, Progress, ProgressStats, Segment, SegmentResult, SegmentState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Translate `text` with the named model using its default segment size.
///
/// Unknown model names fail before any request is made.
pub async fn translate_text<T: Transport>(
    transport: T,
    model: &str,
    text: &str,
    options: JobOptions,
) -> Result<TranslationJob> {
    let adapter = resolve(model)?;
    let mut job = TranslationJob::new(text, adapter.profile().default_segment_size)?;
    let engine = DispatchEngine::new(transport, adapter).with_options(options);
    engine.translate(&mut job, &mut |_: &Progress| {}).await?;
    Ok(job)
}
