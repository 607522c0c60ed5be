use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{
    ChatClient, ChatCompletionRequest, ChatCompletionResponse, Completion, Credentials, send_json,
};
use crate::error::Result;

/// POST one chat completion with a fresh HTTP client.
pub async fn create_completion(
    credentials: &Credentials,
    request: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse> {
    let endpoint = credentials.chat_endpoint();
    debug!(model = %request.model, %endpoint, "sending flat chat completion");

    let builder = Client::new()
        .post(endpoint)
        .bearer_auth(&credentials.api_key)
        .json(request);
    send_json(builder).await
}

/// Adapter from [`create_completion`] to [`ChatClient`].
#[derive(Debug, Clone)]
pub struct LegacyClient {
    credentials: Credentials,
}

impl LegacyClient {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl ChatClient for LegacyClient {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        model: &str,
        temperature: f64,
    ) -> Result<Completion> {
        let request = ChatCompletionRequest::new(system_prompt, user_content, model, temperature);
        create_completion(&self.credentials, &request)
            .await?
            .into_completion()
    }
}
