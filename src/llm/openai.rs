use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use crate::errors::PilotError;
use super::http::{build_client, json_body, send_error};
use super::provider::LLMProvider;
use super::types::{ChatOptions, LLMResponse, Message};

/// Any backend speaking the OpenAI `/chat/completions` dialect.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: Option<&str>, base_url: Option<&str>, timeout_secs: u64) -> Result<Self, PilotError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.to_string(),
            model: model.unwrap_or("gpt-4o-mini").to_string(),
            base_url: base_url.unwrap_or("https://api.openai.com/v1").trim_end_matches('/').to_string(),
        })
    }

    fn request_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": options.temperature,
            "top_p": options.top_p,
            "max_tokens": 1024,
        });
        if options.json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> Result<LLMResponse, PilotError> {
        let resp = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(messages, options))
            .send()
            .await
            .map_err(|e| send_error("OpenAI", e))?;

        let data = json_body("OpenAI", resp).await?;
        let content = data["choices"][0]["message"]["content"].as_str()
            .ok_or_else(|| PilotError::LLMApi("No content in OpenAI response".into()))?
            .to_string();

        Ok(LLMResponse {
            content,
            input_tokens: data["usage"]["prompt_tokens"].as_u64(),
            output_tokens: data["usage"]["completion_tokens"].as_u64(),
            model: self.model.clone(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, PilotError> {
        let resp = self.client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| send_error("OpenAI", e))?;
        let data = json_body("OpenAI", resp).await?;
        Ok(data["data"].as_array()
            .map(|models| {
                models.iter()
                    .filter_map(|m| m["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &str { "openai" }
    fn model_name(&self) -> &str { &self.model }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let provider = OpenAIProvider::new("sk-test", None, None, 5).unwrap();
        let options = ChatOptions::default();
        let body = provider.request_body(&[Message::system("sys"), Message::user("hi")], &options);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["top_p"], 1.0);
    }

    #[test]
    fn test_custom_base_url() {
        let provider = OpenAIProvider::new("k", Some("m"), Some("http://vllm:8000/v1/"), 5).unwrap();
        assert_eq!(provider.base_url, "http://vllm:8000/v1");
        assert_eq!(provider.model_name(), "m");
    }
}
