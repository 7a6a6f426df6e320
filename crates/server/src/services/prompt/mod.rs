//! Language-model client used by the prompt builder.
//!
//! [`CompletionModel`] is the seam: production uses [`ChatClient`] against
//! the Cohere v2 chat endpoint, tests plug in a canned model.

mod error;

pub use error::{ApiErrorResponse, PromptError};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::LlmConfig;

/// A single-turn text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Complete `message` under the `system` instruction.
    ///
    /// Returns the raw model text, which may be empty.
    async fn complete(&self, system: &str, message: &str) -> Result<String, PromptError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl ChatResponse {
    fn into_text(self) -> String {
        self.message
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<String>()
    }
}

/// HTTP chat client.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<ChatClientInner>,
}

struct ChatClientInner {
    client: reqwest::Client,
    model: String,
    api_url: String,
}

impl ChatClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::Config` if the API key is not a valid header
    /// value, or `PromptError::Http` if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, PromptError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| PromptError::Config("API key contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ChatClientInner {
                client,
                model: config.model.clone(),
                api_url: config.api_url.clone(),
            }),
        })
    }

    async fn error_from_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> PromptError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return PromptError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return PromptError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => PromptError::Api {
                status: status.as_u16(),
                message: serde_json::from_str::<ApiErrorResponse>(&body)
                    .map_or(body, |e| e.message),
            },
            Err(e) => PromptError::Http(e),
        }
    }
}

#[async_trait]
impl CompletionModel for ChatClient {
    #[instrument(skip(self, system, message), fields(model = %self.inner.model))]
    async fn complete(&self, system: &str, message: &str) -> Result<String, PromptError> {
        let request = ChatRequest {
            model: &self.inner.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| PromptError::Parse(format!("Failed to parse response: {e}")))?;
        Ok(parsed.into_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "command-r-plus-08-2024",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "be helpful",
                },
                ChatMessage {
                    role: "user",
                    content: "web kopi",
                },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "command-r-plus-08-2024");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "web kopi");
    }

    #[test]
    fn test_response_text_joins_blocks() {
        let body = r#"{
            "id": "c14c80c3",
            "finish_reason": "COMPLETE",
            "message": {
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Sebuah website "},
                    {"type": "text", "text": "untuk Kopi Senja."}
                ]
            }
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text(), "Sebuah website untuk Kopi Senja.");
    }

    #[test]
    fn test_response_without_content_is_empty() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant"}}"#).unwrap();
        assert_eq!(parsed.into_text(), "");
    }

    #[test]
    fn test_client_rejects_invalid_key() {
        let config = LlmConfig {
            api_key: SecretString::from("bad\nkey"),
            model: "command-r-plus-08-2024".to_string(),
            api_url: "https://api.cohere.com/v2/chat".to_string(),
        };
        assert!(matches!(
            ChatClient::new(&config),
            Err(PromptError::Config(_))
        ));
    }
}
