//! Groq-backed completion provider (OpenAI-compatible chat completions).
//!
//! Available behind the `groq` feature. Any endpoint following the OpenAI
//! chat-completions contract works by overriding the base URL, which is also
//! how the tests point the client at a mock server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::message::Message;
use crate::providers::{CompletionError, CompletionProvider, CompletionRequest};

/// Default API root for Groq's OpenAI-compatible surface.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

const PROVIDER: &str = "groq";

/// Completion client for Groq (or any OpenAI-compatible endpoint).
pub struct GroqCompletion {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqCompletion {
    /// Creates a client with the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| CompletionError::Provider {
                provider: PROVIDER,
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        })
    }

    /// Reads `GROQ_API_KEY` from the environment (a `.env` file is honored).
    pub fn from_env() -> Result<Self, CompletionError> {
        let _ = dotenvy::dotenv();
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| CompletionError::Provider {
            provider: PROVIDER,
            message: "GROQ_API_KEY is not set".to_string(),
        })?;
        Self::new(api_key)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn wire_messages(request: &CompletionRequest) -> Vec<WireMessage<'_>> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(WireMessage {
        role: "system",
        content: &request.system,
    });
    for Message { role, content, .. } in &request.history {
        messages.push(WireMessage {
            role: role.as_str(),
            content: content.as_str(),
        });
    }
    messages.push(WireMessage {
        role: "user",
        content: &request.user,
    });
    messages
}

#[async_trait]
impl CompletionProvider for GroqCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatBody {
            model: &self.model,
            messages: wire_messages(&request),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| CompletionError::Provider {
                provider: PROVIDER,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CompletionError::Provider {
                provider: PROVIDER,
                message: format!("HTTP {status}: {detail}"),
            });
        }

        let reply: ChatReply = response.json().await.map_err(|err| {
            CompletionError::Provider {
                provider: PROVIDER,
                message: err.to_string(),
            }
        })?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::Provider {
                provider: PROVIDER,
                message: "empty completion".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn posts_chat_completions_and_extracts_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "test-model"}"#);
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "pong"}}]
                }));
            })
            .await;

        let client = GroqCompletion::new("test-key")
            .unwrap()
            .with_base_url(server.base_url())
            .with_model("test-model");
        let reply = client
            .complete(CompletionRequest::new("system prompt", "ping"))
            .await
            .unwrap();
        assert_eq!(reply, "pong");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_becomes_provider_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = GroqCompletion::new("test-key")
            .unwrap()
            .with_base_url(server.base_url());
        let err = client
            .complete(CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
