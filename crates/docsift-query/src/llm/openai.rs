//! OpenAI-compatible chat completions backend.

use async_trait::async_trait;
use docsift_core::{LanguageModel, LlmError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::post_json;

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Settings for [`OpenAiChat`].
#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Total attempts per request, including the first
    pub max_retries: usize,
}

impl OpenAiChatConfig {
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for OpenAiChatConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Chat-completions client.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_retries: usize,
}

impl OpenAiChat {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// `Request` when the API key is missing or the HTTP client cannot be
    /// built.
    pub fn new(config: OpenAiChatConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::Request("missing OpenAI API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| LlmError::Request("invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            temperature: config.temperature,
            max_retries: config.max_retries.max(1),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
        };

        let response: ChatResponse =
            post_json(&self.client, &self.endpoint, &request, self.max_retries).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let err = OpenAiChat::new(OpenAiChatConfig::default()).err();
        assert!(matches!(err, Some(LlmError::Request(_))));
    }

    #[test]
    fn test_endpoint_and_defaults() {
        let config = OpenAiChatConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..OpenAiChatConfig::with_api_key("sk-test")
        };
        let chat = OpenAiChat::new(config).unwrap();
        assert_eq!(chat.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(chat.model_name(), "gpt-4o-mini");
        assert!((chat.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn test_response_decoding() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"names\":[]}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"names\":[]}")
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let config = OpenAiChatConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 1,
            ..OpenAiChatConfig::with_api_key("sk-test")
        };
        let chat = OpenAiChat::new(config).unwrap();
        let err = chat.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
    }
}
