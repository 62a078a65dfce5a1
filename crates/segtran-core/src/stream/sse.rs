//! Incremental server-sent event decoding
//!
//! Bytes arrive in arbitrary chunks. Lines are cut on `\n` before UTF-8
//! decoding, so a multi-byte character split across chunks is reassembled
//! intact.

/// Payload that marks the end of a provider stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

impl SseEvent {
    /// Event type, `message` when none was given
    pub fn kind(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the stream ends
    pub fn finish(&mut self) -> Option<SseEvent> {
        let mut flushed = None;
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            flushed = self.process_line(line);
        }
        flushed.or_else(|| self.dispatch())
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: meta\nda").is_empty());
        let events = decoder.feed(b"ta: {\"segmentIndex\":1}\n\ndata: hi\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "meta");
        assert_eq!(events[0].data, "{\"segmentIndex\":1}");
        assert_eq!(events[1].kind(), "message");
        assert_eq!(events[1].data, "hi");
    }

    #[test]
    fn test_multibyte_character_across_chunks() {
        let bytes = "data: 翻译\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..8]).is_empty());
        let events = decoder.feed(&bytes[8..]);
        assert_eq!(events[0].data, "翻译");
    }

    #[test]
    fn test_crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\r\ndata: a\r\ndata: b\r\n\r\n");
        assert_eq!(events, vec![SseEvent { event: None, data: "a\nb".to_string() }]);
    }

    #[test]
    fn test_done_sentinel_and_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        let last = decoder.finish().unwrap();
        assert!(last.is_done());
        assert!(decoder.finish().is_none());
    }
}
