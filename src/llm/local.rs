use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use crate::errors::PilotError;
use super::http::{build_client, json_body, send_error};
use super::provider::LLMProvider;
use super::types::{ChatOptions, LLMResponse, Message};

/// Ollama backend: `/api/chat` for completions, `/api/tags` for the
/// capability check.
pub struct LocalProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl LocalProvider {
    pub fn new(base_url: Option<&str>, model: Option<&str>, timeout_secs: u64) -> Result<Self, PilotError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.unwrap_or("http://localhost:11434").trim_end_matches('/').to_string(),
            model: model.unwrap_or("qwen2.5:7b-instruct").to_string(),
        })
    }

    fn request_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "top_p": options.top_p,
            },
        });
        if options.json {
            body["format"] = json!("json");
        }
        body
    }
}

#[async_trait]
impl LLMProvider for LocalProvider {
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<LLMResponse, PilotError> {
        let resp = self.client
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.request_body(messages, options))
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        let data = json_body("Ollama", resp).await?;
        let content = data["message"]["content"].as_str()
            .ok_or_else(|| PilotError::LLMApi("No content in Ollama response".into()))?
            .to_string();

        Ok(LLMResponse {
            content,
            input_tokens: data["prompt_eval_count"].as_u64(),
            output_tokens: data["eval_count"].as_u64(),
            model: self.model.clone(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, PilotError> {
        let resp = self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;
        let data = json_body("Ollama", resp).await?;
        Ok(data["models"].as_array()
            .map(|models| {
                models.iter()
                    .filter_map(|m| m["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &str { "ollama" }
    fn model_name(&self) -> &str { &self.model }
}
