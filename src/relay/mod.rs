//! Streaming relay from an upstream generation provider to a text stream.
//!
//! - [`line_buffer`]: Byte-level reassembly of newline-terminated lines
//! - [`ndjson`]: Ollama newline-delimited JSON decoding
//! - [`sse`]: Groq (OpenAI-compatible) chat-completion event decoding
//!
//! Ollama bodies are split into lines by [`line_buffer::LineBuffer`]; Groq
//! bodies are framed into events by `eventsource-stream`.
//!
//! A relay is a stream of [`Fragment`]s. It yields text until the upstream
//! finishes, or yields exactly one error and ends.

pub mod line_buffer;
pub mod ndjson;
pub mod sse;

use std::any::Any;
use std::future::ready;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{FutureExt, Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::metrics::Metrics;

/// One unit of relay output.
pub type Fragment = Result<String, RelayError>;

/// Boxed stream of fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Fragment> + Send>>;

/// What a decoder made of the bytes it was fed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Text to forward.
    Text(String),
    /// A unit that could not be parsed; already logged, never forwarded.
    Skipped(RelayError),
    /// The provider reported an error inside the stream.
    Failed(String),
    /// The provider signalled the end of generation.
    Done,
}

/// Incremental decoder for a line-oriented streaming body.
pub trait StreamDecoder {
    /// Feed the next network chunk and collect what it completed.
    fn feed(&mut self, chunk: &[u8]) -> Vec<Decoded>;
}

/// An upstream generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name, used in error messages.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether the provider initialized successfully.
    fn is_configured(&self) -> bool {
        true
    }

    /// Send the prompt upstream and return the decoded output stream.
    ///
    /// Fails without yielding anything when the upstream cannot be reached or
    /// rejects the request.
    async fn open(&self, prompt: &str) -> Result<FragmentStream, RelayError>;
}

/// Shared, read-only provider handle.
pub type SharedProvider = Arc<dyn GenerationProvider>;

/// Open the upstream stream, turning a panic into [`RelayError::Unclassified`].
///
/// The returned stream is already [`guarded`](guard).
pub async fn open_relay(
    provider: &dyn GenerationProvider,
    prompt: &str,
) -> Result<FragmentStream, RelayError> {
    match AssertUnwindSafe(provider.open(prompt)).catch_unwind().await {
        Ok(Ok(stream)) => Ok(guard(stream)),
        Ok(Err(e)) => Err(e),
        Err(panic) => Err(RelayError::Unclassified(panic_message(panic.as_ref()))),
    }
}

/// Relay a prompt, reporting failure to open as the stream's only item.
pub fn relay(provider: SharedProvider, prompt: String) -> FragmentStream {
    Box::pin(async_stream::stream! {
        match open_relay(provider.as_ref(), &prompt).await {
            Ok(mut fragments) => {
                while let Some(fragment) = fragments.next().await {
                    yield fragment;
                }
            }
            Err(e) => {
                yield Err(e);
            }
        }
    })
}

/// Enforce the relay contract on an arbitrary fragment stream: a panic becomes
/// an [`RelayError::Unclassified`] item, and nothing follows the first error.
pub fn guard(stream: FragmentStream) -> FragmentStream {
    let caught = AssertUnwindSafe(stream)
        .catch_unwind()
        .map(|item| match item {
            Ok(fragment) => fragment,
            Err(panic) => Err(RelayError::Unclassified(panic_message(panic.as_ref()))),
        });

    Box::pin(caught.scan(false, |failed, fragment| {
        if *failed {
            return ready(None);
        }
        *failed = fragment.is_err();
        ready(Some(fragment))
    }))
}

/// Decode an NDJSON-style HTTP response body into fragments.
///
/// The response (and with it the upstream connection) is dropped as soon as
/// the returned stream ends or is dropped.
pub fn decode_response<D>(
    provider: &str,
    response: reqwest::Response,
    mut decoder: D,
    metrics: Metrics,
) -> FragmentStream
where
    D: StreamDecoder + Send + 'static,
{
    let units = response
        .bytes_stream()
        .map(move |chunk| chunk.map(|chunk| decoder.feed(&chunk)).map_err(read_failure));

    relay_decoded(provider, units, metrics)
}

/// Decode a server-sent event body into fragments, one event at a time.
pub fn decode_events(provider: &str, response: reqwest::Response, metrics: Metrics) -> FragmentStream {
    let units = response.bytes_stream().eventsource().map(|event| match event {
        Ok(event) => Ok(sse::decode_event(&event.data).into_iter().collect::<Vec<_>>()),
        Err(EventStreamError::Transport(e)) => Err(read_failure(e)),
        Err(e) => Err(e.to_string()),
    });

    relay_decoded(provider, units, metrics)
}

/// Forward decoded units as fragments. Skipped units are counted as decode
/// errors. Read failures and provider errors end the stream, as does the end
/// marker.
fn relay_decoded<S>(provider: &str, units: S, metrics: Metrics) -> FragmentStream
where
    S: Stream<Item = Result<Vec<Decoded>, String>> + Send + 'static,
{
    let provider = provider.to_string();

    Box::pin(async_stream::stream! {
        let mut units = Box::pin(units);

        while let Some(unit) = units.next().await {
            let decoded = match unit {
                Ok(decoded) => decoded,
                Err(detail) => {
                    warn!(provider = %provider, error = %detail, "Upstream stream broke");
                    yield Err(RelayError::connection(&provider, detail));
                    return;
                }
            };

            for decoded in decoded {
                match decoded {
                    Decoded::Text(text) => {
                        yield Ok(text);
                    }
                    Decoded::Skipped(e) => {
                        metrics.record_error(&e);
                    }
                    Decoded::Failed(message) => {
                        yield Err(RelayError::protocol(&provider, message));
                        return;
                    }
                    Decoded::Done => {
                        debug!(provider = %provider, "Upstream signalled end of stream");
                        return;
                    }
                }
            }
        }

        debug!(provider = %provider, "Upstream closed");
    })
}

fn read_failure(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "no data received within the read timeout".to_string()
    } else {
        e.to_string()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while producing the stream".to_string()
    }
}
