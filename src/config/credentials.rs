use std::sync::LazyLock;
use regex::Regex;
use tracing::{debug, warn};

/// `$NAME` or `${NAME}` filling the whole value.
static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))$").expect("env reference regex is valid")
});

/// Name of the environment variable `value` refers to, if it is a reference.
pub fn env_reference(value: &str) -> Option<&str> {
    let caps = ENV_REFERENCE.captures(value.trim())?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Resolve the configured LLM API key. A `$NAME` / `${NAME}` reference is
/// looked up through `lookup`; an unset or blank variable leaves no key, so
/// the reference text is never sent as a bearer token. Blank literals also
/// mean no key.
pub fn resolve_api_key<F>(value: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(name) = env_reference(value) else {
        let literal = value.trim();
        return (!literal.is_empty()).then(|| literal.to_string());
    };
    match lookup(name).map(|v| v.trim().to_string()) {
        Some(resolved) if !resolved.is_empty() => {
            debug!(var = %name, "Resolved API key from environment");
            Some(resolved)
        }
        _ => {
            warn!(var = %name, "API key references an unset environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_reference_forms() {
        assert_eq!(env_reference("$OPENAI_API_KEY"), Some("OPENAI_API_KEY"));
        assert_eq!(env_reference("${TEAM_KEY}"), Some("TEAM_KEY"));
        assert_eq!(env_reference("sk-$abc"), None);
        assert_eq!(env_reference("${UNCLOSED"), None);
        assert_eq!(env_reference("$1"), None);
    }

    #[test]
    fn test_literal_key_kept() {
        assert_eq!(resolve_api_key(" sk-literal ", env(&[])), Some("sk-literal".to_string()));
        assert_eq!(resolve_api_key("  ", env(&[])), None);
    }

    #[test]
    fn test_reference_resolved() {
        let lookup = env(&[("TEAM_KEY", "sk-team\n")]);
        assert_eq!(resolve_api_key("${TEAM_KEY}", &lookup), Some("sk-team".to_string()));
        assert_eq!(resolve_api_key("$TEAM_KEY", &lookup), Some("sk-team".to_string()));
    }

    #[test]
    fn test_unset_or_blank_reference_leaves_no_key() {
        assert_eq!(resolve_api_key("$MISSING_KEY", env(&[])), None);
        assert_eq!(resolve_api_key("${BLANK_KEY}", env(&[("BLANK_KEY", " ")])), None);
    }
}
