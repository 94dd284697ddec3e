//! Decoder for Ollama's newline-delimited JSON generate stream.
//!
//! Each line is a JSON object such as
//! `{"model":"mistral","response":"Hel","done":false}`. The final line carries
//! `"done":true` and timing fields, usually with an empty `response`.

use serde::Deserialize;
use tracing::warn;

use crate::error::RelayError;
use crate::relay::line_buffer::LineBuffer;
use crate::relay::{Decoded, StreamDecoder};

/// One line of `/api/generate` output. Unknown fields are ignored.
///
/// An empty `response` (as on the closing `done` line) adds nothing to the
/// answer and is not forwarded.
#[derive(Debug, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    lines: LineBuffer,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_line(line: &str) -> Option<Decoded> {
        if line.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<GenerateChunk>(line) {
            Ok(GenerateChunk {
                error: Some(message),
                ..
            }) => Some(Decoded::Failed(message)),
            Ok(GenerateChunk {
                response: Some(text),
                ..
            }) if !text.is_empty() => Some(Decoded::Text(text)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, line, "Skipping invalid JSON line");
                Some(Decoded::Skipped(RelayError::Decode(e.to_string())))
            }
        }
    }
}

impl StreamDecoder for NdjsonDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<Decoded> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| Self::decode_line(line))
            .collect()
    }
}
