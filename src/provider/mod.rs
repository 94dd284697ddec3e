//! Upstream generation providers.
//!
//! - [`ollama`]: Local Ollama server (`/api/generate`, NDJSON)
//! - [`groq`]: Hosted Groq API (OpenAI-compatible chat completions, SSE)
//!
//! The provider is built once at start-up. If it cannot be built, an
//! [`Unconfigured`] stand-in answers every request with a configuration error.

pub mod groq;
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::RelayError;
use crate::metrics::Metrics;
use crate::relay::{FragmentStream, GenerationProvider, SharedProvider};

use groq::GroqProvider;
use ollama::OllamaProvider;

/// Build the configured provider, reading credentials from the environment.
///
/// Undecodable stream units are counted in `metrics`.
pub fn build_provider(config: &ProviderConfig, metrics: &Metrics) -> SharedProvider {
    let name = config.kind.to_string();
    let model = config.model().to_string();

    let provider: Result<SharedProvider, RelayError> = http_client(config).and_then(|client| {
        Ok(match config.kind {
            ProviderKind::Ollama => {
                Arc::new(OllamaProvider::new(client, &config.ollama, metrics.clone()))
                    as SharedProvider
            }
            ProviderKind::Groq => {
                let api_key = std::env::var(&config.groq.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        RelayError::Configuration(format!(
                            "{} is not set; the Groq client could not be initialized",
                            config.groq.api_key_env
                        ))
                    })?;
                Arc::new(GroqProvider::new(
                    client,
                    api_key,
                    &config.groq,
                    metrics.clone(),
                )) as SharedProvider
            }
        })
    });

    match provider {
        Ok(provider) => {
            info!(provider = %name, model = %model, "Provider ready");
            provider
        }
        Err(e) => {
            warn!(provider = %name, error = %e, "Provider unavailable, requests will be answered with a configuration error");
            Arc::new(Unconfigured {
                name,
                model,
                error: e,
            })
        }
    }
}

/// The timeout bounds connecting and each wait for the next body chunk, not
/// the whole request, so a long answer that keeps flowing is never cut off.
fn http_client(config: &ProviderConfig) -> Result<Client, RelayError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.request_timeout() {
        builder = builder.connect_timeout(timeout).read_timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| RelayError::Configuration(format!("HTTP client could not be built: {e}")))
}

/// Turn a non-success upstream reply into an error, preferring the provider's
/// own message (`{"error": "..."}` or `{"error": {"message": "..."}}`).
pub(crate) async fn upstream_failure(provider: &str, response: reqwest::Response) -> RelayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .as_str()
                .or_else(|| error.get("message").and_then(|m| m.as_str()))
                .map(str::to_string)
        })
        .unwrap_or(body);

    if message.is_empty() {
        RelayError::protocol(provider, format!("HTTP {status}"))
    } else {
        RelayError::protocol(provider, format!("HTTP {status}: {message}"))
    }
}

/// Stand-in for a provider that failed to initialize. Never touches the network.
#[derive(Debug)]
pub struct Unconfigured {
    name: String,
    model: String,
    error: RelayError,
}

impl Unconfigured {
    pub fn new(name: impl Into<String>, model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            error: RelayError::Configuration(reason.into()),
        }
    }
}

#[async_trait]
impl GenerationProvider for Unconfigured {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn open(&self, _prompt: &str) -> Result<FragmentStream, RelayError> {
        Err(self.error.clone())
    }
}
