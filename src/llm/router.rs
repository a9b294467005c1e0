use crate::config::LLMConfig;
use crate::errors::PilotError;
use super::provider::LLMProvider;
use super::openai::OpenAIProvider;
use super::local::LocalProvider;
use super::catalog::{self, PROVIDERS};
use tracing::warn;

/// Resolve the configured provider name against the catalog. Unknown names
/// fall back to the first catalog entry with a warning rather than failing.
pub fn resolve_provider_id(name: &str) -> &'static str {
    match catalog::get_provider(name) {
        Some(p) => p.id,
        None => {
            let fallback = PROVIDERS[0].id;
            warn!(provider = %name, fallback, "Unknown LLM provider, falling back");
            fallback
        }
    }
}

pub fn create_provider(config: &LLMConfig) -> Result<Box<dyn LLMProvider>, PilotError> {
    let id = resolve_provider_id(&config.provider);
    let model = config.model.as_deref().or_else(|| catalog::get_default_model(id));
    let base_url = config.base_url.as_deref();

    match id {
        "ollama" => Ok(Box::new(LocalProvider::new(base_url, model, config.timeout_secs)?)),
        "openai" => {
            let api_key = config.api_key.as_deref().unwrap_or_default();
            Ok(Box::new(OpenAIProvider::new(api_key, model, base_url, config.timeout_secs)?))
        }
        other => Err(PilotError::Config(format!("No client for LLM provider: {}", other))),
    }
}
