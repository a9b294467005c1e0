use async_trait::async_trait;
use crate::errors::PilotError;
use super::types::{ChatOptions, LLMResponse, Message};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Chat completion; returns the first choice's message content.
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<LLMResponse, PilotError>;

    /// Single-prompt convenience wrapper around [`LLMProvider::chat`].
    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        options: &ChatOptions,
    ) -> Result<LLMResponse, PilotError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(prompt));
        self.chat(&messages, options).await
    }

    /// Capability check: succeeds when the backend is reachable and returns
    /// the models it can serve.
    async fn list_models(&self) -> Result<Vec<String>, PilotError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;
}
