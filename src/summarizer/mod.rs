//! Digest generation.
//!
//! ```text
//! [ContentItem] → prompt template → one chat completion → DigestResult
//! ```
//!
//! - [`Summarizer`]: renders the prompt, makes the call, tracks token usage
//! - [`CompletionClient`]: the seam to the model API ([`OpenAiClient`])
//! - [`prompt`]: template rendering and article formatting

pub mod client;
pub mod prompt;

pub use client::{
    Completion, CompletionClient, CompletionError, CompletionRequest, OpenAiClient,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};

use std::sync::Arc;

use chrono::Utc;

use crate::config::DEFAULT_DAYS_LOOKBACK;
use crate::domain::{ContentItem, DigestResult};
use prompt::PromptError;

const SYSTEM_PROMPT: &str = "You are a skilled editor creating weekly news digests. \
Analyze the provided articles and create a comprehensive digest in clean, semantic HTML.";

const TEMPERATURE: f32 = 0.5;

const MAX_TOKENS: u32 = 4000;

/// Why no digest was produced. None of these are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("no items to summarize")]
    EmptyBatch,

    #[error("rate limit hit: {0}")]
    RateLimited(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid prompt template: {0}")]
    Prompt(#[from] PromptError),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<CompletionError> for SummarizeError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::RateLimited(msg) => Self::RateLimited(msg),
            CompletionError::Connection(msg) => Self::Connection(msg),
            CompletionError::Api { status, message } => Self::Api { status, message },
            CompletionError::Unexpected(msg) => Self::Unexpected(msg),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub total_tokens: u64,
    pub requests: u32,
}

pub struct Summarizer {
    client: Arc<dyn CompletionClient + Send + Sync>,
    model: String,
    lookback_days: u32,
    usage: TokenUsage,
}

impl Summarizer {
    pub fn new(client: Arc<dyn CompletionClient + Send + Sync>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            lookback_days: DEFAULT_DAYS_LOOKBACK,
            usage: TokenUsage::default(),
        }
    }

    /// Width of the window named in the prompt's `{date_range}`.
    #[must_use]
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn set_lookback_days(&mut self, days: u32) {
        self.lookback_days = days;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Tokens consumed by this instance so far.
    pub fn token_usage(&self) -> TokenUsage {
        self.usage
    }

    /// Current `{date_range}` value.
    pub fn date_range(&self) -> String {
        prompt::date_range(Utc::now(), self.lookback_days)
    }

    /// Produce one digest from `items` with a single completion call.
    pub async fn summarize(
        &mut self,
        items: &[ContentItem],
        prompt_template: &str,
        config_name: &str,
    ) -> Result<DigestResult, SummarizeError> {
        let result = self.try_summarize(items, prompt_template, config_name).await;

        match &result {
            Ok(_) => tracing::info!("Successfully generated digest"),
            Err(SummarizeError::EmptyBatch) => {
                tracing::warn!("No items provided for digest generation")
            }
            Err(SummarizeError::RateLimited(msg)) => {
                tracing::warn!("Rate limit hit during digest generation: {}", msg)
            }
            Err(SummarizeError::Connection(msg)) => {
                tracing::error!("API connection error during digest generation: {}", msg)
            }
            Err(SummarizeError::Api { status, message }) => {
                tracing::error!(status, "API error during digest generation: {}", message)
            }
            Err(e) => tracing::error!("Error generating digest: {}", e),
        }

        result
    }

    async fn try_summarize(
        &mut self,
        items: &[ContentItem],
        prompt_template: &str,
        config_name: &str,
    ) -> Result<DigestResult, SummarizeError> {
        if items.is_empty() {
            return Err(SummarizeError::EmptyBatch);
        }

        let prompt = prompt::render_template(
            prompt_template,
            &[
                ("article_count", items.len().to_string()),
                ("article_list", prompt::format_articles(items)),
                ("date_range", self.date_range()),
            ],
        )?;

        tracing::info!("Generating digest for {} items", items.len());

        let request = CompletionRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let completion = self.client.complete(&request).await?;

        self.usage.total_tokens += completion.total_tokens;
        self.usage.requests += 1;
        tracing::info!("Digest generation tokens used: {}", completion.total_tokens);

        let body = completion.text.trim();
        if body.is_empty() {
            return Err(SummarizeError::Unexpected("model returned an empty digest".into()));
        }

        Ok(DigestResult::new(
            format!("{} Digest", config_name),
            Utc::now(),
            config_name,
            items.len(),
            body,
        )
        .with_metadata("model", completion.model)
        .with_metadata("tokens_used", completion.total_tokens)
        .with_metadata("total_tokens", self.usage.total_tokens))
    }
}
