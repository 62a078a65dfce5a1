//! Canonical proxy envelope and correlation metadata
//!
//! Every proxy response is `{ success, data, error, code, meta }`. The `meta`
//! object echoes the correlation token sent with the request so that replies
//! can be matched to segments regardless of completion order.

use crate::http::error::{TransportError, TransportErrorKind};
use crate::types::OffsetRange;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upstream error discriminator surfaced by the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyErrorCode {
    AuthError,
    RateLimitError,
    TimeoutError,
    ApiError,
}

/// Correlation token attached to each request and echoed back by the proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMeta {
    /// Zero-based segment index
    pub segment_index: usize,
    /// Total segments in the job
    pub total: usize,
    /// Recovered source range of the segment
    pub offset: OffsetRange,
}

/// Response envelope produced by the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<ProxyErrorCode>,
    #[serde(default)]
    pub meta: Option<CorrelationMeta>,
}

/// Successful proxy reply
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    /// Provider payload, parsed by the backend adapter
    pub data: Value,
    /// Echoed correlation token, when the proxy returned one
    pub meta: Option<CorrelationMeta>,
}

impl ProxyEnvelope {
    /// Parse an envelope from a response body
    pub fn parse(body: &str) -> Result<Self, TransportError> {
        serde_json::from_str(body).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Body,
                format!("response is not a proxy envelope: {}", e),
            )
        })
    }

    /// Convert into a reply, or the error the proxy reported
    pub fn into_reply(self) -> Result<ProxyReply, TransportError> {
        if !self.success {
            let message = self
                .error
                .unwrap_or_else(|| "proxy reported failure without a message".to_string());
            return Err(match self.code {
                Some(code) => TransportError::from_proxy_code(code, message),
                None => TransportError::new(TransportErrorKind::Proxy, message),
            });
        }

        match self.data {
            Some(data) => Ok(ProxyReply {
                data,
                meta: self.meta,
            }),
            None => Err(TransportError::new(
                TransportErrorKind::Body,
                "successful envelope carried no data",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_wire_format() {
        let meta = CorrelationMeta {
            segment_index: 2,
            total: 5,
            offset: OffsetRange::new(10, 42),
        };
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"segmentIndex": 2, "total": 5, "offset": {"start": 10, "end": 42}})
        );
    }

    #[test]
    fn test_successful_envelope() {
        let envelope = ProxyEnvelope::parse(
            r#"{"success":true,"data":{"x":1},"meta":{"segmentIndex":1,"total":2,"offset":{"start":0,"end":3}}}"#,
        )
        .unwrap();
        let reply = envelope.into_reply().unwrap();
        assert_eq!(reply.data, json!({"x": 1}));
        assert_eq!(reply.meta.unwrap().segment_index, 1);
    }

    #[test]
    fn test_failed_envelope_maps_code() {
        let envelope =
            ProxyEnvelope::parse(r#"{"success":false,"error":"bad key","code":"AUTH_ERROR"}"#)
                .unwrap();
        let error = envelope.into_reply().unwrap_err();
        assert_eq!(error.proxy_code, Some(ProxyErrorCode::AuthError));
        assert_eq!(error.message, "bad key");
    }

    #[test]
    fn test_bare_payload_is_rejected() {
        let error = ProxyEnvelope::parse(r#"{"choices":[]}"#).unwrap_err();
        assert_eq!(error.kind, TransportErrorKind::Body);
    }

    #[test]
    fn test_success_without_data_is_rejected() {
        let error = ProxyEnvelope::parse(r#"{"success":true}"#)
            .unwrap()
            .into_reply()
            .unwrap_err();
        assert_eq!(error.kind, TransportErrorKind::Body);
    }
}
