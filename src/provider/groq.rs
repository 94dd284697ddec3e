//! Hosted Groq API via its OpenAI-compatible `POST /chat/completions`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GroqConfig;
use crate::error::RelayError;
use crate::metrics::Metrics;
use crate::provider::upstream_failure;
use crate::relay::{decode_events, FragmentStream, GenerationProvider};

const NAME: &str = "Groq";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

pub struct GroqProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    metrics: Metrics,
}

impl GroqProvider {
    pub fn new(client: Client, api_key: String, config: &GroqConfig, metrics: Metrics) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            metrics,
        }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: true,
        }
    }
}

#[async_trait]
impl GenerationProvider for GroqProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open(&self, prompt: &str) -> Result<FragmentStream, RelayError> {
        debug!(endpoint = %self.endpoint, model = %self.model, "Opening Groq stream");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "Could not reach Groq");
                RelayError::connection(NAME, e)
            })?;

        if !response.status().is_success() {
            return Err(upstream_failure(NAME, response).await);
        }

        Ok(decode_events(NAME, response, self.metrics.clone()))
    }
}
