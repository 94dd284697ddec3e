//! HTTP server relaying prompts to the configured provider.
//!
//! - [`relay_api`]: Routes, handlers and shared state
//! - [`streaming`]: Fragment stream to chunked `text/plain` body

pub mod relay_api;
pub mod streaming;
