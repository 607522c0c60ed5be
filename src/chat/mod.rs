//! Chat completion clients.
//!
//! Two call styles for the same chat-completions endpoint sit behind
//! [`ChatClient`]: a long-lived client object ([`openai::OpenAiClient`]),
//! and a flat free function ([`legacy::create_completion`]). Both send the
//! same payload and read the same response shape. [`connect`] picks one at
//! startup.

pub mod legacy;
pub mod openai;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ApiStyle, EffectiveConfig};
use crate::error::{Error, Result};
use crate::utils::env::Environment;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A finished completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub reply: String,
    pub usage: Usage,
    pub response_id: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        model: &str,
        temperature: f64,
    ) -> Result<Completion>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl Credentials {
    /// Read the API key (required) and base URL (optional).
    pub fn from_env(env: &Environment) -> Result<Self> {
        let api_key = env
            .get_non_empty(API_KEY_VAR)
            .ok_or(Error::MissingCredential { var: API_KEY_VAR })?
            .trim()
            .to_string();

        let base_url = env
            .get_non_empty(BASE_URL_VAR)
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
            .trim_end_matches('/')
            .to_string();

        Ok(Self { api_key, base_url })
    }

    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

pub fn connect(credentials: &Credentials, config: &EffectiveConfig) -> Box<dyn ChatClient> {
    debug!(style = ?config.api_style, base_url = %credentials.base_url, "selected chat api");

    match config.api_style {
        ApiStyle::Legacy => Box::new(legacy::LegacyClient::new(credentials.clone())),
        ApiStyle::Chat | ApiStyle::Auto => {
            Box::new(openai::OpenAiClient::new(credentials.clone()))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

impl ChatCompletionRequest {
    /// System message first (omitted when the prompt is empty), then the user
    /// message.
    pub fn new(system_prompt: &str, user_content: &str, model: &str, temperature: f64) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_content.to_string(),
        });

        Self {
            model: model.to_string(),
            messages,
            temperature,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Take `choices[0].message.content` as the reply, unmodified.
    pub fn into_completion(self) -> Result<Completion> {
        let reply = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::chat(None, "API returned no content in the response"))?;

        Ok(Completion {
            reply,
            usage: self.usage.unwrap_or_default(),
            response_id: self.id.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Send a request and decode a JSON body, mapping every failure to
/// `ChatRequest`.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|err| Error::chat(None, err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        return Err(map_http_error(status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|err| {
            Error::chat(
                Some(status.as_u16()),
                format!("unexpected response format: {err}"),
            )
        })
}

fn map_http_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    Error::chat(Some(status.as_u16()), message)
}
