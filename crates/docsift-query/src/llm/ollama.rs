//! Ollama `/api/generate` backend.

use async_trait::async_trait;
use docsift_core::{LanguageModel, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::post_json;

/// Settings for [`OllamaModel`].
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

/// Local model served by Ollama, asked for JSON output.
pub struct OllamaModel {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

impl OllamaModel {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// `Request` if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model,
            max_retries: config.max_retries.max(1),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            system,
            prompt: user,
            format: "json",
            stream: false,
        };

        let response: GenerateResponse =
            post_json(&self.client, &self.endpoint, &request, self.max_retries).await?;

        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(response.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
