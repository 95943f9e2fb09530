//! Minimal SSE stream decoding for chat-completions responses.
//!
//! The provider streams `data: {...}` lines terminated by a `[DONE]`
//! sentinel; chunks may split frames at arbitrary byte boundaries, so the
//! decoder buffers partial lines between pushes.

use serde::de::DeserializeOwned;

// Bound against malformed streams that never emit a newline.
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes, returning every complete `data:` frame it
    /// completes. Remaining partial input stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        if self.buffer.len() > MAX_BUFFER_SIZE {
            tracing::warn!("SSE buffer exceeded limit, truncating");
            let keep_from = self.buffer.len() - MAX_BUFFER_SIZE / 2;
            self.buffer = self.buffer[keep_from..].to_string();
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim().to_string();
            self.buffer.drain(..=pos);

            if let Some(data) = line.strip_prefix("data: ") {
                frames.push(SseFrame {
                    data: data.to_string(),
                });
            }
        }
        frames
    }
}

/// One complete `data:` line, prefix stripped.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }

    pub fn try_parse<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"x\":1}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"x\":1}");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"par").is_empty());
        let frames = decoder.push(b"t\":2}\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"part\":2}");
    }

    #[test]
    fn test_done_sentinel() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: [DONE]\n");
        assert!(frames[0].is_done());
    }

    #[test]
    fn test_non_data_lines_skipped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keepalive\nevent: ping\ndata: ok\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "ok");
    }

    #[test]
    fn test_try_parse() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"value\":42}\n");
        let parsed: serde_json::Value = frames[0].try_parse().unwrap();
        assert_eq!(parsed["value"], 42);

        let frames = decoder.push(b"data: not-json\n");
        assert!(frames[0].try_parse::<serde_json::Value>().is_none());
    }
}
