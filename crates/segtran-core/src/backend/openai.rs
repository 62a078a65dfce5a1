//! Chat-completions style backends (DeepSeek, GPT-4o)

use super::prompt::system_prompt;
use super::{parse_event_json, BackendAdapter, ModelId};
use crate::{Error, Result};
use serde_json::{json, Value};

/// Adapter for backends speaking the chat-completions format
#[derive(Debug, Clone)]
pub struct ChatCompletionsAdapter {
    model: ModelId,
    upstream_model: &'static str,
    temperature: f64,
}

impl ChatCompletionsAdapter {
    pub fn deepseek() -> Self {
        Self {
            model: ModelId::DeepSeek,
            upstream_model: "deepseek-chat",
            temperature: 0.3,
        }
    }

    pub fn gpt4o() -> Self {
        Self {
            model: ModelId::Gpt4o,
            upstream_model: "gpt-4o",
            temperature: 0.3,
        }
    }
}

impl BackendAdapter for ChatCompletionsAdapter {
    fn model(&self) -> ModelId {
        self.model
    }

    fn build_request(&self, segment_text: &str, custom_prompt: Option<&str>) -> Value {
        json!({
            "model": self.upstream_model,
            "messages": [
                { "role": "system", "content": system_prompt(custom_prompt) },
                { "role": "user", "content": segment_text }
            ],
            "temperature": self.temperature,
        })
    }

    fn parse_response(&self, payload: &Value) -> Result<String> {
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::parse(self.model.as_str(), "missing choices[0].message.content")
            })
    }

    fn parse_stream_event(&self, data: &str) -> Result<String> {
        let event = parse_event_json(self.model, data)?;
        Ok(event
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let payload = ChatCompletionsAdapter::deepseek().build_request("你好", None);
        assert_eq!(payload["model"], "deepseek-chat");
        assert_eq!(payload["messages"][1]["content"], "你好");
        assert_eq!(payload["messages"][0]["role"], "system");

        let custom = ChatCompletionsAdapter::gpt4o().build_request("x", Some("Be brief."));
        assert_eq!(custom["model"], "gpt-4o");
        assert_eq!(custom["messages"][0]["content"], "Be brief.");
    }

    #[test]
    fn test_parse_response() {
        let adapter = ChatCompletionsAdapter::gpt4o();
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "Hello"}}]});
        assert_eq!(adapter.parse_response(&payload).unwrap(), "Hello");

        let err = adapter.parse_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, Error::ResponseParse { .. }));
    }

    #[test]
    fn test_parse_stream_event() {
        let adapter = ChatCompletionsAdapter::deepseek();
        assert_eq!(
            adapter
                .parse_stream_event(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#)
                .unwrap(),
            "Hel"
        );
        assert_eq!(
            adapter
                .parse_stream_event(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#)
                .unwrap(),
            ""
        );
        assert!(adapter.parse_stream_event("not json").is_err());
    }
}
