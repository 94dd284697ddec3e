//! prompt-relay: streams a prompt to an LLM provider and relays the answer.
//!
//! A caller posts a prompt; the relay opens one streaming request to the
//! configured provider (a local Ollama server or the hosted Groq API), decodes
//! the provider's stream incrementally and forwards each text fragment as
//! part of a chunked `text/plain` response. Failures are reported in-band.

pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod relay;
pub mod server;
