//! Transport seam between the dispatch engine and the proxy

use crate::http::envelope::{CorrelationMeta, ProxyReply};
use crate::http::error::TransportError;
use futures_util::Stream;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Raw response body chunks of a streaming request
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// One request to the proxy
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    /// Path appended to the proxy base URL
    pub endpoint: String,
    /// Provider-specific payload built by the backend adapter
    pub payload: Value,
    /// Correlation token the proxy echoes back
    pub meta: CorrelationMeta,
    /// Per-request deadline
    pub timeout: Duration,
}

/// Anything that can carry a [`ProxyRequest`] to a translation backend.
///
/// Implementations own credentials; the engine never sees them.
pub trait Transport {
    /// Send a request and wait for the whole envelope
    fn send(
        &self,
        request: ProxyRequest,
    ) -> impl Future<Output = Result<ProxyReply, TransportError>>;

    /// Open a server-sent event stream
    fn open_stream(
        &self,
        request: ProxyRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>>;
}

impl<T: Transport> Transport for &T {
    fn send(
        &self,
        request: ProxyRequest,
    ) -> impl Future<Output = Result<ProxyReply, TransportError>> {
        (**self).send(request)
    }

    fn open_stream(
        &self,
        request: ProxyRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> {
        (**self).open_stream(request)
    }
}
