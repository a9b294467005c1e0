pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub env_var: &'static str,
    pub default_base_url: &'static str,
    pub models: &'static [ModelInfo],
}

pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub recommended: bool,
}

/// Known backends. The first entry is the fallback for unknown provider names.
pub static PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        id: "ollama",
        name: "Ollama",
        env_var: "",
        default_base_url: "http://localhost:11434",
        models: &[
            ModelInfo { id: "qwen2.5:7b-instruct", label: "Qwen 2.5 7B Instruct", recommended: true },
            ModelInfo { id: "llama3.1:8b", label: "Llama 3.1 8B", recommended: false },
        ],
    },
    ProviderInfo {
        id: "openai",
        name: "OpenAI-compatible",
        env_var: "OPENAI_API_KEY",
        default_base_url: "https://api.openai.com/v1",
        models: &[
            ModelInfo { id: "gpt-4o-mini", label: "GPT-4o Mini", recommended: true },
            ModelInfo { id: "gpt-4o", label: "GPT-4o", recommended: false },
        ],
    },
];

pub fn get_provider(id: &str) -> Option<&'static ProviderInfo> {
    PROVIDERS.iter().find(|p| p.id == id)
}

pub fn get_default_model(provider_id: &str) -> Option<&'static str> {
    let provider = get_provider(provider_id)?;
    provider.models.iter()
        .find(|m| m.recommended)
        .or_else(|| provider.models.first())
        .map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_providers() {
        assert!(get_provider("ollama").is_some());
        assert!(get_provider("openai").is_some());
        assert!(get_provider("anthropic").is_none());
    }

    #[test]
    fn test_default_model_is_recommended() {
        assert_eq!(get_default_model("ollama"), Some("qwen2.5:7b-instruct"));
        assert_eq!(get_default_model("openai"), Some("gpt-4o-mini"));
        assert_eq!(get_default_model("nope"), None);
    }
}
