//! Transport error classification
//!
//! Failures from the proxy are reduced to a closed set of kinds so that retry
//! policy depends on what happened on the wire, not on error message wording.

use crate::http::envelope::{ProxyEnvelope, ProxyErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Request or upstream timed out
    Timeout,
    /// Connection could not be established
    ConnectionRefused,
    /// Connection dropped mid-request
    ConnectionReset,
    /// Non-success HTTP status without a more specific proxy code
    Status,
    /// Proxy reported a failure in its envelope
    Proxy,
    /// Response body missing, unreadable or not the canonical envelope
    Body,
    /// Anything else
    Other,
}

impl TransportErrorKind {
    /// Network-level failures are eligible for a delayed retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportErrorKind::Timeout
                | TransportErrorKind::ConnectionRefused
                | TransportErrorKind::ConnectionReset
        )
    }
}

/// Normalized transport error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// HTTP status code if a response was received
    pub status_code: Option<u16>,
    /// Proxy error discriminator if the envelope carried one
    pub proxy_code: Option<ProxyErrorCode>,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            proxy_code: None,
            message: message.into(),
        }
    }

    /// Create from a request-level error raised by reqwest
    pub fn from_request_error(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::ConnectionRefused
        } else if let Some(kind) = io_kind(&error) {
            kind
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };

        Self {
            kind,
            status_code: error.status().map(|s| s.as_u16()),
            proxy_code: None,
            message: error.to_string(),
        }
    }

    /// Create from a proxy envelope error code
    pub fn from_proxy_code(code: ProxyErrorCode, message: impl Into<String>) -> Self {
        let kind = match code {
            ProxyErrorCode::TimeoutError => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Proxy,
        };
        Self {
            kind,
            status_code: None,
            proxy_code: Some(code),
            message: message.into(),
        }
    }

    /// Create from a non-success status and whatever body came with it
    pub fn from_status(status: u16, body: &str) -> Self {
        let envelope = serde_json::from_str::<ProxyEnvelope>(body).ok();
        let message = envelope
            .as_ref()
            .and_then(|e| e.error.clone())
            .unwrap_or_else(|| format!("proxy returned HTTP {}: {}", status, truncate(body, 200)));

        let mut error = match envelope.and_then(|e| e.code) {
            Some(code) => Self::from_proxy_code(code, message),
            None if status == 504 || status == 408 => {
                Self::new(TransportErrorKind::Timeout, message)
            }
            None => Self::new(TransportErrorKind::Status, message),
        };
        error.status_code = Some(status);
        error
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Walk the source chain for an io::Error the connection layer gave up on
fn io_kind(error: &(dyn std::error::Error + 'static)) -> Option<TransportErrorKind> {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::ConnectionRefused => Some(TransportErrorKind::ConnectionRefused),
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof => Some(TransportErrorKind::ConnectionReset),
                std::io::ErrorKind::TimedOut => Some(TransportErrorKind::Timeout),
                _ => None,
            };
        }
        source = err.source();
    }
    None
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transport error [{}]: {} (kind: {:?})",
            self.status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            self.message,
            self.kind
        )
    }
}

impl std::error::Error for TransportError {}
