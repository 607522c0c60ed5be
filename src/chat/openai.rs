use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{
    ChatClient, ChatCompletionRequest, ChatCompletionResponse, Completion, Credentials, send_json,
};
use crate::error::Result;

/// Client for the chat-completions endpoint. Holds one HTTP client for its
/// whole lifetime.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    credentials: Credentials,
}

impl OpenAiClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        model: &str,
        temperature: f64,
    ) -> Result<Completion> {
        let body = ChatCompletionRequest::new(system_prompt, user_content, model, temperature);
        let endpoint = self.credentials.chat_endpoint();

        debug!(model, %endpoint, "sending chat completion");
        let request = self
            .client
            .post(endpoint)
            .bearer_auth(&self.credentials.api_key)
            .json(&body);

        let parsed: ChatCompletionResponse = send_json(request).await?;
        parsed.into_completion()
    }
}
