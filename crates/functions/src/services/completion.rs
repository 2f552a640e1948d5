//! Text-completion client for the OpenAI chat completions API.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::CompletionConfig;

const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Errors that can occur when calling the completion API.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response had no text content.
    #[error("empty completion")]
    Empty,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion and return the trimmed text of the first choice.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

/// OpenAI chat completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(client: reqwest::Client, config: CompletionConfig) -> Self {
        Self {
            inner: Arc::new(OpenAiClientInner { client, config }),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    #[instrument(skip(self, messages), fields(model = %self.inner.config.model))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let config = &self.inner.config;
        let request = CompletionRequest {
            model: &config.model,
            messages,
            temperature: DEFAULT_TEMPERATURE,
        };

        let response = self
            .inner
            .client
            .post(&config.api_url)
            .bearer_auth(config.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        first_choice_text(body)
    }
}

fn first_choice_text(response: CompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(CompletionError::Empty)
}
