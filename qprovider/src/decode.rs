//! Resilient decoding of the chunked, line-delimited streaming body.
//!
//! ```rust
//! use qprovider::LineDecoder;
//!
//! let mut decoder = LineDecoder::default();
//! assert!(decoder.push(b"data: {\"text\":\"hel").is_empty());
//! assert_eq!(decoder.push(b"lo\"}\n"), vec!["data: {\"text\":\"hello\"}"]);
//! ```

use crate::wire::ApiStreamRecord;

/// Marker prefixing every relevant line of the streaming body.
pub const EVENT_PREFIX: &str = "data:";

/// Splits an incoming byte stream into complete lines, carrying any trailing
/// partial line over to the next push. A transport chunk boundary may land
/// anywhere, including mid-character, so the carry buffer holds raw bytes.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            match String::from_utf8(line) {
                Ok(text) => lines.push(text),
                Err(error) => {
                    tracing::warn!(%error, "skipping stream line with invalid utf-8");
                }
            }
        }

        lines
    }

    /// Drains the final unterminated line, if any, at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        let line = std::mem::take(&mut self.buffer);
        match String::from_utf8(line) {
            Ok(text) => Some(text),
            Err(error) => {
                tracing::warn!(%error, "discarding trailing stream bytes with invalid utf-8");
                None
            }
        }
    }
}

/// Returns the JSON payload of an event line, or `None` for anything that
/// does not follow the event-prefix convention (keep-alives, blank lines).
pub fn event_payload(line: &str) -> Option<&str> {
    line.trim().strip_prefix(EVENT_PREFIX).map(str::trim)
}

pub fn decode_record(payload: &str) -> Result<ApiStreamRecord, serde_json::Error> {
    serde_json::from_str(payload)
}
