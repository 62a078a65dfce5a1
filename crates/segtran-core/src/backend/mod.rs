//! Backend adapters
//!
//! One strategy per model. An adapter builds the provider payload, names the
//! proxy endpoint and pulls translated text out of responses and stream events.
//! Dispatch is on [`ModelId`], never on the shape of a response.

pub mod claude;
pub mod openai;
pub mod prompt;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use claude::ClaudeAdapter;
pub use openai::ChatCompletionsAdapter;

/// Supported translation models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "claude")]
    Claude,
}

impl ModelId {
    /// Every supported model, in display order
    pub fn all() -> &'static [ModelId] {
        &[ModelId::DeepSeek, ModelId::Gpt4o, ModelId::Claude]
    }

    /// Identifier used on the command line and in proxy paths
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::DeepSeek => "deepseek",
            ModelId::Gpt4o => "gpt-4o",
            ModelId::Claude => "claude",
        }
    }

    /// Default throughput profile
    pub fn profile(&self) -> BackendProfile {
        match self {
            ModelId::DeepSeek => BackendProfile {
                default_segment_size: 4000,
                concurrency_limit: 3,
                request_timeout: Duration::from_secs(120),
            },
            ModelId::Gpt4o => BackendProfile {
                default_segment_size: 4000,
                concurrency_limit: 3,
                request_timeout: Duration::from_secs(90),
            },
            ModelId::Claude => BackendProfile {
                default_segment_size: 3000,
                concurrency_limit: 2,
                request_timeout: Duration::from_secs(180),
            },
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" | "deepseek-chat" => Ok(ModelId::DeepSeek),
            "gpt-4o" | "gpt4o" => Ok(ModelId::Gpt4o),
            "claude" => Ok(ModelId::Claude),
            _ => Err(Error::UnsupportedModel {
                model: s.to_string(),
            }),
        }
    }
}

/// Throughput limits for one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// Segment size in characters used when the caller gives none
    pub default_segment_size: usize,
    /// Maximum in-flight requests
    pub concurrency_limit: usize,
    /// Deadline for one request
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Per-model request construction and response parsing
pub trait BackendAdapter: Send + Sync + fmt::Debug {
    fn model(&self) -> ModelId;

    /// Throughput profile; overridable for tuned deployments
    fn profile(&self) -> BackendProfile {
        self.model().profile()
    }

    /// Provider payload for one segment
    fn build_request(&self, segment_text: &str, custom_prompt: Option<&str>) -> Value;

    /// Proxy path for this backend
    fn endpoint(&self, streaming: bool) -> String {
        let base = format!("/api/translate/{}", self.model().as_str());
        if streaming {
            format!("{}/stream", base)
        } else {
            base
        }
    }

    /// Translated text from a complete response payload
    fn parse_response(&self, payload: &Value) -> Result<String>;

    /// Text delta carried by one stream event's data; empty when the event has none
    fn parse_stream_event(&self, data: &str) -> Result<String>;
}

/// Adapter for a model
pub fn adapter_for(model: ModelId) -> Box<dyn BackendAdapter> {
    match model {
        ModelId::DeepSeek => Box::new(ChatCompletionsAdapter::deepseek()),
        ModelId::Gpt4o => Box::new(ChatCompletionsAdapter::gpt4o()),
        ModelId::Claude => Box::new(ClaudeAdapter::new()),
    }
}

/// Resolve a model name to its adapter
pub fn resolve(name: &str) -> Result<Box<dyn BackendAdapter>> {
    name.parse::<ModelId>().map(adapter_for)
}

/// Parse stream event data as JSON, reporting failures against `backend`
pub(crate) fn parse_event_json(backend: ModelId, data: &str) -> Result<Value> {
    serde_json::from_str(data)
        .map_err(|e| Error::parse(backend.as_str(), format!("invalid stream event: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("deepseek".parse::<ModelId>().unwrap(), ModelId::DeepSeek);
        assert_eq!("GPT-4o".parse::<ModelId>().unwrap(), ModelId::Gpt4o);
        assert_eq!(" claude ".parse::<ModelId>().unwrap(), ModelId::Claude);
    }

    #[test]
    fn test_unknown_model_fails_immediately() {
        let err = resolve("llama").unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel { ref model } if model == "llama"));
    }

    #[test]
    fn test_profiles() {
        let claude = ModelId::Claude.profile();
        assert_eq!(claude.concurrency_limit, 2);
        assert_eq!(claude.default_segment_size, 3000);
        assert!(claude.request_timeout > ModelId::Gpt4o.profile().request_timeout);
        assert_eq!(ModelId::DeepSeek.profile().concurrency_limit, 3);
    }

    #[test]
    fn test_endpoints() {
        let adapter = adapter_for(ModelId::Gpt4o);
        assert_eq!(adapter.endpoint(false), "/api/translate/gpt-4o");
        assert_eq!(adapter.endpoint(true), "/api/translate/gpt-4o/stream");
    }

    #[test]
    fn test_model_serde_names() {
        assert_eq!(serde_json::to_string(&ModelId::Gpt4o).unwrap(), "\"gpt-4o\"");
        let model: ModelId = serde_json::from_str("\"claude\"").unwrap();
        assert_eq!(model, ModelId::Claude);
        for model in ModelId::all() {
            assert_eq!(model.to_string().parse::<ModelId>().unwrap(), *model);
        }
    }
}
