use std::path::Path;
use crate::errors::PilotError;
use super::credentials::resolve_api_key;
use super::schema::{schema_violations, CONFIG_SCHEMA};
use super::types::AppConfig;
use tracing::{debug, warn};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "webpilot.yaml";

/// Build the process configuration: defaults, then the YAML file (explicit
/// path, or `webpilot.yaml` when present), then environment overrides.
pub async fn load_config(path: Option<&Path>) -> Result<AppConfig, PilotError> {
    let mut config = match path {
        Some(p) => parse_config_file(p).await?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                parse_config_file(default_path).await?
            } else {
                debug!("No config file, using defaults");
                AppConfig::default()
            }
        }
    };

    apply_environment(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Environment overrides, then `$NAME` references in the API key.
pub fn apply_environment<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(config, &lookup);
    config.llm.api_key = config.llm.api_key.take().and_then(|key| resolve_api_key(&key, &lookup));
}

pub async fn parse_config_file(path: &Path) -> Result<AppConfig, PilotError> {
    if !path.exists() {
        return Err(PilotError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(PilotError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<AppConfig, PilotError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| PilotError::Config(format!("Invalid config YAML: {}", e)))?;
    if yaml.is_null() {
        return Ok(AppConfig::default());
    }

    // Schema validation is advisory: unknown keys and out-of-range values
    // are logged, type errors fail below.
    let json_value = serde_json::to_value(&yaml)
        .map_err(|e| PilotError::Config(format!("Config conversion error: {}", e)))?;
    match schema_violations(&CONFIG_SCHEMA, &json_value) {
        Ok(messages) => {
            for msg in &messages {
                warn!(validation_error = %msg, "Config schema warning");
            }
        }
        Err(e) => warn!(error = %e, "Config schema unavailable"),
    }

    serde_yaml::from_value(yaml)
        .map_err(|e| PilotError::Config(format!("Invalid config: {}", e)))
}

/// Apply `WEBPILOT_*` environment overrides. `lookup` is injected so the
/// precedence rules can be tested without touching the process environment.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(provider) = lookup("WEBPILOT_LLM_PROVIDER") {
        config.llm.provider = provider;
    }
    if let Some(model) = lookup("WEBPILOT_LLM_MODEL") {
        config.llm.model = Some(model);
    }
    if let Some(base_url) = lookup("WEBPILOT_LLM_BASE_URL") {
        config.llm.base_url = Some(base_url);
    }
    if let Some(key) = lookup("WEBPILOT_LLM_API_KEY") {
        config.llm.api_key = Some(key);
    } else if config.llm.api_key.is_none() && config.llm.provider == "openai" {
        config.llm.api_key = lookup("OPENAI_API_KEY");
    }
    if let Some(raw) = lookup("WEBPILOT_MAX_TICKS") {
        match raw.parse::<u32>() {
            Ok(ticks) => config.agent.max_ticks = ticks,
            Err(_) => warn!(value = %raw, "Ignoring non-numeric WEBPILOT_MAX_TICKS"),
        }
    }
    if let Some(raw) = lookup("WEBPILOT_HEADLESS") {
        config.browser.headless = !matches!(raw.to_lowercase().as_str(), "0" | "false" | "no");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.agent.max_ticks, 25);
    }

    #[test]
    fn test_parse_config_sections() {
        let yaml = "llm:\n  provider: openai\n  model: gpt-4o-mini\nrunner:\n  parallel: true\n  workers: 4\n";
        let config = parse_config_str(yaml).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
        assert!(config.runner.parallel);
        assert_eq!(config.runner.workers, 4);
    }

    #[test]
    fn test_type_error_is_config_error() {
        let err = parse_config_str("agent:\n  max_ticks: lots\n").unwrap_err();
        assert!(matches!(err, PilotError::Config(_)));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = parse_config_str("llm:\n  provider: ollama\n").unwrap();
        apply_env_overrides(&mut config, env(&[
            ("WEBPILOT_LLM_PROVIDER", "openai"),
            ("WEBPILOT_MAX_TICKS", "9"),
            ("WEBPILOT_HEADLESS", "false"),
        ]));
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.agent.max_ticks, 9);
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_openai_key_fallback() {
        let mut config = AppConfig::default();
        config.llm.provider = "openai".to_string();
        apply_env_overrides(&mut config, env(&[("OPENAI_API_KEY", "sk-env")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_api_key_reference_resolved() {
        let mut config = parse_config_str("llm:\n  provider: openai\n  api_key: \"${TEAM_KEY}\"\n").unwrap();
        apply_environment(&mut config, env(&[("TEAM_KEY", "sk-team")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-team"));
    }

    #[test]
    fn test_unresolved_api_key_reference_is_dropped() {
        let mut config = parse_config_str("llm:\n  provider: openai\n  api_key: $TEAM_KEY\n").unwrap();
        apply_environment(&mut config, env(&[]));
        assert_eq!(config.llm.api_key, None);
        assert!(!config.warnings().is_empty());
    }

    #[test]
    fn test_bad_max_ticks_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, env(&[("WEBPILOT_MAX_TICKS", "many")]));
        assert_eq!(config.agent.max_ticks, 25);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let err = parse_config_file(Path::new("/nonexistent/webpilot.yaml")).await.unwrap_err();
        assert!(matches!(err, PilotError::Config(_)));
    }
}
