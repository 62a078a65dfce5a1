//! Streaming support: SSE decoding and delta assembly

pub mod assembler;
pub mod sse;

pub use assembler::{AssembledDelta, StreamAssembler};
pub use sse::{SseDecoder, SseEvent, DONE_SENTINEL};
