//! Local Ollama server via `POST /api/generate`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::RelayError;
use crate::metrics::Metrics;
use crate::provider::upstream_failure;
use crate::relay::ndjson::NdjsonDecoder;
use crate::relay::{decode_response, FragmentStream, GenerationProvider};

const NAME: &str = "Ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    model: String,
    metrics: Metrics,
}

impl OllamaProvider {
    pub fn new(client: Client, config: &OllamaConfig, metrics: Metrics) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            metrics,
        }
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open(&self, prompt: &str) -> Result<FragmentStream, RelayError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Opening Ollama stream");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "Could not reach Ollama");
                RelayError::connection(NAME, e)
            })?;

        if !response.status().is_success() {
            return Err(upstream_failure(NAME, response).await);
        }

        Ok(decode_response(
            NAME,
            response,
            NdjsonDecoder::new(),
            self.metrics.clone(),
        ))
    }
}
