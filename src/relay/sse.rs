//! Payload decoding for OpenAI-compatible chat-completion event streams (Groq).
//!
//! Event framing (multi-line `data:` fields, comments, the blank line that
//! ends an event) is handled by `eventsource-stream`; this module only turns
//! one event's data into a [`Decoded`] unit. The stream ends with `[DONE]`.

use serde::Deserialize;
use tracing::warn;

use crate::error::RelayError;
use crate::relay::Decoded;

/// Sentinel data of the final event.
pub const DONE: &str = "[DONE]";

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamError {
    #[serde(default)]
    pub message: String,
}

impl ChatCompletionChunk {
    /// Content of the first choice, if any and non-empty.
    pub fn content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
    }
}

/// Decode the data of one event. Role-only and empty deltas yield nothing.
pub fn decode_event(data: &str) -> Option<Decoded> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    if data == DONE {
        return Some(Decoded::Done);
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(ChatCompletionChunk {
            error: Some(err), ..
        }) => Some(Decoded::Failed(err.message)),
        Ok(chunk) => chunk.content().map(Decoded::Text),
        Err(e) => {
            warn!(error = %e, data, "Skipping undecodable event");
            Some(Decoded::Skipped(RelayError::Decode(e.to_string())))
        }
    }
}
