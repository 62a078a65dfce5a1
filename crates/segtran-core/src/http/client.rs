//! Proxy client
//!
//! Posts `{ payload, meta }` to the translation proxy and unwraps the canonical
//! envelope. The credential is held in memory only and sent as a bearer token.

use crate::http::envelope::{ProxyEnvelope, ProxyReply};
use crate::http::error::TransportError;
use crate::http::transport::{ByteStream, ProxyRequest, Transport};
use crate::{Error, Result};
use futures_util::StreamExt;
use reqwest::{header, Client as ReqwestClient, Response};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Configuration for the proxy client
#[derive(Clone)]
pub struct ProxyClientConfig {
    /// Proxy base URL, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Bearer credential forwarded to the proxy
    pub api_key: Option<String>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ProxyClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("segtran/{}", crate::VERSION),
        }
    }
}

impl ProxyClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// Keep the credential out of debug output
impl fmt::Debug for ProxyClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// HTTP transport to the translation proxy
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: ReqwestClient,
    base_url: Url,
    config: ProxyClientConfig,
}

impl ProxyClient {
    /// Create a new client
    pub fn new(config: ProxyClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Configuration {
            message: format!("Invalid proxy URL '{}': {}", config.base_url, e),
            source: Some(anyhow::anyhow!(e)),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Proxy URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let client = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(anyhow::anyhow!(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for an endpoint path
    pub fn endpoint_url(&self, endpoint: &str) -> std::result::Result<Url, TransportError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(endpoint.trim_start_matches('/')).map_err(|e| {
            TransportError::new(
                crate::http::error::TransportErrorKind::Other,
                format!("invalid endpoint '{}': {}", endpoint, e),
            )
        })
    }

    async fn post(
        &self,
        request: &ProxyRequest,
        streaming: bool,
    ) -> std::result::Result<Response, TransportError> {
        let url = self.endpoint_url(&request.endpoint)?;
        let body = json!({
            "payload": request.payload,
            "meta": request.meta,
        });

        let mut builder = self
            .client
            .post(url)
            .timeout(request.timeout)
            .json(&body);
        if streaming {
            builder = builder.header(header::ACCEPT, "text/event-stream");
        }
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            endpoint = %request.endpoint,
            segment = request.meta.segment_index,
            streaming,
            "sending proxy request"
        );

        let response = builder
            .send()
            .await
            .map_err(TransportError::from_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), &text));
        }
        Ok(response)
    }
}

impl Transport for ProxyClient {
    async fn send(&self, request: ProxyRequest) -> std::result::Result<ProxyReply, TransportError> {
        let response = self.post(&request, false).await?;
        let body = response
            .text()
            .await
            .map_err(TransportError::from_request_error)?;
        ProxyEnvelope::parse(&body)?.into_reply()
    }

    async fn open_stream(
        &self,
        request: ProxyRequest,
    ) -> std::result::Result<ByteStream, TransportError> {
        let response = self.post(&request, true).await?;
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(TransportError::from_request_error)
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_paths() {
        let client = ProxyClient::new(ProxyClientConfig::new("http://localhost:3000")).unwrap();
        assert_eq!(
            client.endpoint_url("/api/translate/deepseek").unwrap().as_str(),
            "http://localhost:3000/api/translate/deepseek"
        );

        let prefixed =
            ProxyClient::new(ProxyClientConfig::new("https://example.com/proxy")).unwrap();
        assert_eq!(
            prefixed.endpoint_url("/api/translate/claude/stream").unwrap().as_str(),
            "https://example.com/proxy/api/translate/claude/stream"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ProxyClient::new(ProxyClientConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProxyClientConfig::default().with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
