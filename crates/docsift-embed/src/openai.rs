//! OpenAI-compatible embeddings backend.

use async_trait::async_trait;
use docsift_core::{EmbedError, Embedder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default embeddings model.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Dimension of [`DEFAULT_MODEL`].
pub const DEFAULT_DIMENSION: usize = 1536;

/// Settings for [`OpenAiEmbedder`].
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
    /// Total attempts per request, including the first
    pub max_retries: usize,
}

impl OpenAiEmbedderConfig {
    /// Defaults for the public OpenAI endpoint with the given key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for OpenAiEmbedderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    max_retries: usize,
}

impl OpenAiEmbedder {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// `ModelLoad` when the API key is missing or the HTTP client cannot be
    /// built.
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self, EmbedError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(EmbedError::ModelLoad("missing OpenAI API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| EmbedError::ModelLoad("invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedError::ModelLoad(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model,
            dimension: config.dimension,
            max_retries: config.max_retries.max(1),
        })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn is_retryable_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
                            EmbedError::Inference(format!("malformed embeddings response: {e}"))
                        })?;
                        debug!("Embedding request succeeded after {} retries", attempt);
                        return parsed
                            .data
                            .into_iter()
                            .min_by_key(|entry| entry.index)
                            .map(|entry| entry.embedding)
                            .ok_or_else(|| {
                                EmbedError::Inference("embeddings response had no data".to_string())
                            });
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("Embeddings request returned {}, retrying ({})", status, attempt);
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Request(format!("{status}: {body}")));
                }
                Err(err) => {
                    if Self::is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("Embeddings request failed: {}, retrying ({})", err, attempt);
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Request(err.to_string()));
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let err = OpenAiEmbedder::new(OpenAiEmbedderConfig::with_api_key("  ")).err();
        assert!(matches!(err, Some(EmbedError::ModelLoad(_))));
    }

    #[test]
    fn test_endpoint_and_defaults() {
        let config = OpenAiEmbedderConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..OpenAiEmbedderConfig::with_api_key("sk-test")
        };
        let embedder = OpenAiEmbedder::new(config).unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:8080/v1/embeddings");
        assert_eq!(embedder.model_name(), DEFAULT_MODEL);
        assert_eq!(embedder.dimension(), DEFAULT_DIMENSION);
    }

    #[test]
    fn test_should_retry() {
        assert!(OpenAiEmbedder::should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(OpenAiEmbedder::should_retry(StatusCode::BAD_GATEWAY));
        assert!(!OpenAiEmbedder::should_retry(StatusCode::UNAUTHORIZED));
        assert!(!OpenAiEmbedder::should_retry(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_retry_backoff_grows_and_caps() {
        assert_eq!(OpenAiEmbedder::retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(OpenAiEmbedder::retry_backoff(2), Duration::from_millis(2000));
        assert_eq!(OpenAiEmbedder::retry_backoff(9), Duration::from_millis(16000));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"model":"x","usage":{}}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let config = OpenAiEmbedderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 1,
            ..OpenAiEmbedderConfig::with_api_key("sk-test")
        };
        let embedder = OpenAiEmbedder::new(config).unwrap();
        let err = embedder.embed_text("hello").await.unwrap_err();
        assert!(matches!(err, EmbedError::Request(_)));
    }
}
