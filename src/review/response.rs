use serde_json::{json, Map, Value};
use crate::agent::parser::json_object_candidates;
use crate::errors::PilotError;
use crate::recording::sidecars::{check_override_schema, validate_overrides, OverrideEntry};
use crate::recording::types::Recording;

const LIST_KEYS: &[&str] = &["overrides", "suggested_overrides", "suggestedOverrides", "recommendations"];
const WRAPPER_KEYS: &[&str] = &["result", "data"];

/// Bring a model reply into the canonical `{"overrides": [...]}` shape.
/// Returns `None` when no override list can be found.
pub fn normalize(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => Some(json!({ "overrides": items })),
        Value::Object(map) => {
            for key in LIST_KEYS {
                if let Some(list) = map.get(*key) {
                    return match list {
                        Value::Array(items) => Some(json!({ "overrides": items })),
                        Value::Null => Some(json!({ "overrides": [] })),
                        other => normalize(other),
                    };
                }
            }
            for key in WRAPPER_KEYS {
                if let Some(inner) = map.get(*key) {
                    if let Some(found) = normalize(inner) {
                        return Some(found);
                    }
                }
            }
            looks_like_entry(map).then(|| json!({ "overrides": [value] }))
        }
        _ => None,
    }
}

fn looks_like_entry(map: &Map<String, Value>) -> bool {
    map.contains_key("step") && map.contains_key("action") && map.contains_key("locator")
}

/// Parse a reviewer reply into validated override entries: lenient
/// extraction, key normalisation, schema check, then a semantic check
/// against the recording.
pub fn parse_review_response(raw: &str, recording: &Recording) -> Result<Vec<OverrideEntry>, PilotError> {
    let mut candidates = json_object_candidates(raw);
    if let Ok(array @ Value::Array(_)) = serde_json::from_str::<Value>(raw.trim()) {
        candidates.insert(0, array);
    }

    let canonical = candidates
        .iter()
        .find_map(normalize)
        .ok_or_else(|| PilotError::Review("no override list in model response".to_string()))?;

    check_override_schema(&canonical)?;
    let entries: Vec<OverrideEntry> = serde_json::from_value(canonical["overrides"].clone())
        .map_err(|e| PilotError::Validation(format!("override entries: {}", e)))?;
    validate_overrides(recording, &entries)?;
    Ok(entries)
}
