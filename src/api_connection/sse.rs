//! Incremental decoder for OpenRouter's server-sent event stream.
//!
//! Each event is a single `data: {json}` line carrying a
//! [`ChatCompletionChunk`]; `data: [DONE]` ends the stream and lines starting
//! with `:` are keep-alive comments. Network chunks can split lines (and UTF-8
//! sequences) anywhere, so bytes are buffered until a newline arrives.

use super::connection::ApiConnectionError;
use super::endpoints::ChatCompletionChunk;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` or an error has been seen. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consumes raw bytes and returns the text deltas of every complete line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<String, ApiConnectionError>> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line, &mut out);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Flushes a final line that had no trailing newline and ends the stream.
    pub fn finish(&mut self) -> Vec<Result<String, ApiConnectionError>> {
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut out);
        }
        self.done = true;
        out
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut Vec<Result<String, ApiConnectionError>>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            // Blank separators, ":" comments, and event/id fields carry no text.
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }
        if payload == DONE_MARKER {
            self.done = true;
            return;
        }

        match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    self.done = true;
                    out.push(Err(ApiConnectionError::StreamError(error.message)));
                    return;
                }
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        out.push(Ok(content));
                    }
                }
            }
            Err(e) => {
                self.done = true;
                tracing::debug!(payload, "Undecodable stream payload");
                out.push(Err(ApiConnectionError::SerializationError(e)));
            }
        }
    }
}
