//! Claude messages backend

use super::prompt::system_prompt;
use super::{parse_event_json, BackendAdapter, ModelId};
use crate::{Error, Result};
use serde_json::{json, Value};

const UPSTREAM_MODEL: &str = "claude-3-5-sonnet-latest";
const MAX_TOKENS: u32 = 8192;

#[derive(Debug, Clone, Default)]
pub struct ClaudeAdapter;

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl BackendAdapter for ClaudeAdapter {
    fn model(&self) -> ModelId {
        ModelId::Claude
    }

    fn build_request(&self, segment_text: &str, custom_prompt: Option<&str>) -> Value {
        json!({
            "model": UPSTREAM_MODEL,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt(custom_prompt),
            "messages": [
                { "role": "user", "content": segment_text }
            ],
        })
    }

    fn parse_response(&self, payload: &Value) -> Result<String> {
        let blocks = payload
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::parse("claude", "missing content blocks"))?;

        let text: String = blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();

        if text.is_empty() && !blocks.is_empty() {
            return Err(Error::parse("claude", "no text content block"));
        }
        Ok(text)
    }

    fn parse_stream_event(&self, data: &str) -> Result<String> {
        let event = parse_event_json(ModelId::Claude, data)?;
        if event.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            return Ok(String::new());
        }
        Ok(event
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_uses_system_field() {
        let payload = ClaudeAdapter::new().build_request("文本", None);
        assert_eq!(payload["messages"][0]["content"], "文本");
        assert!(payload["system"].as_str().unwrap().contains("academic"));
    }

    #[test]
    fn test_parse_content_blocks() {
        let payload = json!({
            "content": [
                {"type": "text", "text": "First "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "second"}
            ]
        });
        assert_eq!(ClaudeAdapter::new().parse_response(&payload).unwrap(), "First second");
        assert!(ClaudeAdapter::new().parse_response(&json!({"id": "msg"})).is_err());
    }

    #[test]
    fn test_stream_events() {
        let adapter = ClaudeAdapter::new();
        assert_eq!(
            adapter
                .parse_stream_event(
                    r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#
                )
                .unwrap(),
            "Hi"
        );
        assert_eq!(
            adapter.parse_stream_event(r#"{"type":"message_start"}"#).unwrap(),
            ""
        );
    }
}
