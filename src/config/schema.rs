use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "llm": {
                "type": "object",
                "properties": {
                    "provider": { "type": "string" },
                    "model": { "type": "string" },
                    "base_url": { "type": "string" },
                    "api_key": { "type": "string" },
                    "temperature": { "type": "number", "minimum": 0, "maximum": 2 },
                    "top_p": { "type": "number", "minimum": 0, "maximum": 1 },
                    "timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "browser": {
                "type": "object",
                "properties": {
                    "node_binary": { "type": "string" },
                    "headless": { "type": "boolean" },
                    "viewport": {
                        "type": "object",
                        "required": ["width", "height"],
                        "properties": {
                            "width": { "type": "integer", "minimum": 1 },
                            "height": { "type": "integer", "minimum": 1 }
                        }
                    },
                    "action_timeout_ms": { "type": "integer", "minimum": 1 },
                    "navigation_timeout_ms": { "type": "integer", "minimum": 1 }
                }
            },
            "agent": {
                "type": "object",
                "properties": {
                    "max_ticks": { "type": "integer", "minimum": 1 },
                    "history_window": { "type": "integer", "minimum": 0 },
                    "settle_delay_ms": { "type": "integer", "minimum": 0 },
                    "load_state_timeout_ms": { "type": "integer", "minimum": 0 },
                    "expectation_timeout_ms": { "type": "integer", "minimum": 0 },
                    "ax_tree_max_chars": { "type": "integer", "minimum": 100 },
                    "visible_text_max_chars": { "type": "integer", "minimum": 0 },
                    "max_wait_ms": { "type": "integer", "minimum": 0 }
                }
            },
            "runner": {
                "type": "object",
                "properties": {
                    "parallel": { "type": "boolean" },
                    "workers": { "type": "integer", "minimum": 1 }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "directory": { "type": "string" }
                }
            }
        }
    })
});

/// Validate `instance` against `schema`, returning one message per violation.
pub fn schema_violations(schema: &Value, instance: &Value) -> Result<Vec<String>, String> {
    let compiled = jsonschema::JSONSchema::compile(schema)
        .map_err(|e| format!("Schema compilation error: {}", e))?;

    let messages = match compiled.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{} at {}", e, path)
                }
            })
            .collect(),
    };
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_has_no_violations() {
        let instance = json!({"agent": {"max_ticks": 10}, "runner": {"parallel": true, "workers": 3}});
        assert!(schema_violations(&CONFIG_SCHEMA, &instance).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_section_is_reported() {
        let instance = json!({"scan": {"intensity": "quick"}});
        let violations = schema_violations(&CONFIG_SCHEMA, &instance).unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_zero_ticks_is_reported() {
        let instance = json!({"agent": {"max_ticks": 0}});
        let violations = schema_violations(&CONFIG_SCHEMA, &instance).unwrap();
        assert!(violations[0].contains("/agent/max_ticks"));
    }
}
