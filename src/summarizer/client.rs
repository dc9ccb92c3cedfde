//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::app::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Model reported by the server, which may differ from the one requested.
    pub model: String,
    pub total_tokens: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("rate limited by completion API: {0}")]
    RateLimited(String),

    #[error("could not reach completion API: {0}")]
    Connection(String),

    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected completion response: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait CompletionClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Talks to `<base_url>/chat/completions` with bearer auth.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point at a proxy or another OpenAI-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    CompletionError::Connection(e.to_string())
                } else {
                    CompletionError::Unexpected(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::Connection(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited(error_message(&text)));
        }
        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionError::Unexpected(format!("invalid JSON: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::Unexpected("response has no content".into()))?;

        Ok(Completion {
            text: content,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            total_tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}
