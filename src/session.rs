use chrono::{DateTime, Local};

use crate::chat::Completion;
use crate::config::EffectiveConfig;

/// One finished clipboard → completion → clipboard exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub timestamp: DateTime<Local>,
    pub system_prompt: String,
    pub user_input: String,
    pub reply: String,
    pub model: String,
    pub temperature: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub response_id: String,
}

impl SessionRecord {
    pub fn new(
        timestamp: DateTime<Local>,
        config: &EffectiveConfig,
        user_input: &str,
        completion: &Completion,
    ) -> Self {
        Self {
            timestamp,
            system_prompt: config.system_prompt.clone(),
            user_input: user_input.to_string(),
            reply: completion.reply.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            total_tokens: completion.usage.total_tokens,
            response_id: completion.response_id.clone(),
        }
    }
}
