//! Proxy communication
//!
//! This module provides:
//! - The canonical proxy envelope and correlation metadata
//! - Transport error classification
//! - Fixed-delay retry for transient failures
//! - The `Transport` seam and its `reqwest` implementation

pub mod client;
pub mod envelope;
pub mod error;
pub mod retry;
pub mod transport;

pub use client::{ProxyClient, ProxyClientConfig};
pub use envelope::{CorrelationMeta, ProxyEnvelope, ProxyErrorCode, ProxyReply};
pub use error::{TransportError, TransportErrorKind};
pub use retry::{execute_with_retry, RetryDecision, RetryHandler, RetryPolicy, RetryReport, Retryable};
pub use transport::{ByteStream, ProxyRequest, Transport};
