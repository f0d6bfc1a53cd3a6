//! Language-model backends used by the query interpreter.
//!
//! | Type | Endpoint | Default model |
//! |------|----------|---------------|
//! | [`OpenAiChat`] | `/chat/completions` | `gpt-4o-mini` |
//! | [`OllamaModel`] | `/api/generate` | `llama3.2` |
//! | [`StaticModel`] | none | canned replies |

pub mod ollama;
pub mod openai;

pub use ollama::{OllamaConfig, OllamaModel};
pub use openai::{OpenAiChat, OpenAiChatConfig};

use async_trait::async_trait;
use docsift_core::{LanguageModel, LlmError};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// POST `body` as JSON and decode the reply, retrying rate limits, server
/// errors and transport failures up to `max_attempts` times in total.
pub(crate) async fn post_json<B, T>(
    client: &Client,
    url: &str,
    body: &B,
    max_attempts: usize,
) -> Result<T, LlmError>
where
    B: Serialize + Sync,
    T: DeserializeOwned,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        match client.post(url).json(body).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    debug!("Language model request to {} succeeded after {} retries", url, attempt);
                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| LlmError::Decode(e.to_string()));
                }

                let text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                if should_retry(status) && attempt + 1 < max_attempts {
                    attempt += 1;
                    warn!("Language model returned {}, retrying ({})", status, attempt);
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }
                return Err(LlmError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }
            Err(err) => {
                if is_retryable_error(&err) && attempt + 1 < max_attempts {
                    attempt += 1;
                    warn!("Language model request failed: {}, retrying ({})", err, attempt);
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }
                return Err(LlmError::Request(err.to_string()));
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

/// Model that answers every prompt with the same reply.
///
/// Useful in tests and for running searches without a model endpoint.
#[derive(Debug)]
pub struct StaticModel {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

impl StaticModel {
    /// Always reply with `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with a request error carrying `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions requested so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for StaticModel {
    fn model_name(&self) -> &str {
        "static"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(LlmError::Request)
    }
}
