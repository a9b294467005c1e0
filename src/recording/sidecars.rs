//! Override and assertion sidecar files.
//!
//! `<stem>.overrides.json` replaces the scorer's locator for a step, keyed by
//! `(step, action)`. `<stem>.assertions.json` injects checks after a step.
//! Step indexes count action steps from 0, skipping `navigate` and
//! `setViewport`, so in `[navigate, click]` the click is step 0.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::browser::locator::Descriptor;
use crate::config::schema::schema_violations;
use crate::errors::PilotError;
use super::types::Recording;

pub const OVERRIDES_SUFFIX: &str = ".overrides.json";
pub const ASSERTIONS_SUFFIX: &str = ".assertions.json";

pub static OVERRIDES_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["overrides"],
        "properties": {
            "overrides": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["step", "action", "locator"],
                    "properties": {
                        "step": { "type": "integer", "minimum": 0 },
                        "action": { "type": "string", "minLength": 1 },
                        "note": { "type": "string" },
                        "locator": {
                            "type": "object",
                            "required": ["kind"],
                            "properties": {
                                "kind": { "enum": ["role", "label", "testid", "text", "css", "active"] }
                            }
                        }
                    }
                }
            }
        }
    })
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    #[serde(alias = "stepIndex", alias = "step_index")]
    pub step: usize,
    pub action: String,
    pub locator: Descriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OverrideEntry {
    pub fn key(&self) -> (usize, String) {
        (self.step, self.action.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideFile {
    pub overrides: Vec<OverrideEntry>,
}

/// Accepted on-disk shapes; always written back as [`OverrideFile`].
#[derive(Deserialize)]
#[serde(untagged)]
enum OverrideShape {
    File(OverrideFile),
    List(Vec<OverrideEntry>),
    Single(OverrideEntry),
}

/// A check injected into generated scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssertionCheck {
    UrlContains {
        value: String,
    },
    VisibleText {
        value: String,
    },
    RoleVisible {
        role: String,
        #[serde(default, alias = "value", skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionEntry {
    #[serde(alias = "after_step")]
    pub after_step: usize,
    pub expect: Vec<AssertionCheck>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssertionFile {
    pub assertions: Vec<AssertionEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AssertionShape {
    File(AssertionFile),
    List(Vec<AssertionEntry>),
    Single(AssertionEntry),
}

/// Sidecar paths for a recording: `login.json` -> `login.overrides.json`.
pub fn sidecar_paths(recording: &Path) -> (PathBuf, PathBuf) {
    let stem = recording.file_stem().and_then(|s| s.to_str()).unwrap_or("recording");
    let dir = recording.parent().unwrap_or_else(|| Path::new("."));
    (
        dir.join(format!("{}{}", stem, OVERRIDES_SUFFIX)),
        dir.join(format!("{}{}", stem, ASSERTIONS_SUFFIX)),
    )
}

pub fn is_sidecar(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.ends_with(OVERRIDES_SUFFIX) || name.ends_with(ASSERTIONS_SUFFIX)
}

pub fn parse_overrides(content: &str) -> Result<Vec<OverrideEntry>, PilotError> {
    let shape: OverrideShape = serde_json::from_str(content)
        .map_err(|e| PilotError::Validation(format!("invalid overrides file: {}", e)))?;
    Ok(match shape {
        OverrideShape::File(f) => f.overrides,
        OverrideShape::List(v) => v,
        OverrideShape::Single(e) => vec![e],
    })
}

pub fn parse_assertions(content: &str) -> Result<Vec<AssertionEntry>, PilotError> {
    let shape: AssertionShape = serde_json::from_str(content)
        .map_err(|e| PilotError::Validation(format!("invalid assertions file: {}", e)))?;
    Ok(match shape {
        AssertionShape::File(f) => f.assertions,
        AssertionShape::List(v) => v,
        AssertionShape::Single(e) => vec![e],
    })
}

/// Missing sidecar files mean "no entries".
pub async fn load_overrides(path: &Path) -> Result<Vec<OverrideEntry>, PilotError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path).await?;
    parse_overrides(&content).map_err(|e| PilotError::Validation(format!("{}: {}", path.display(), e)))
}

pub async fn load_assertions(path: &Path) -> Result<Vec<AssertionEntry>, PilotError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path).await?;
    parse_assertions(&content).map_err(|e| PilotError::Validation(format!("{}: {}", path.display(), e)))
}

pub async fn save_overrides(path: &Path, entries: &[OverrideEntry]) -> Result<(), PilotError> {
    let file = OverrideFile { overrides: entries.to_vec() };
    let mut content = serde_json::to_string_pretty(&file)?;
    content.push('\n');
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Check override entries against the canonical schema.
pub fn check_override_schema(value: &Value) -> Result<(), PilotError> {
    let violations = schema_violations(&OVERRIDES_SCHEMA, value).map_err(PilotError::Internal)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(PilotError::Validation(violations.join("; ")))
    }
}

/// Every `(step, action)` must exist in the recording with a matching
/// step type, and every locator must be well-formed. All problems are
/// reported together.
pub fn validate_overrides(recording: &Recording, entries: &[OverrideEntry]) -> Result<(), PilotError> {
    let mut problems = Vec::new();
    let actions = recording.action_steps();
    for entry in entries {
        match actions.get(entry.step) {
            None => problems.push(format!(
                "override step {} is out of range (recording has {} action steps)",
                entry.step,
                actions.len()
            )),
            Some(step) if step.step_type != entry.action => problems.push(format!(
                "override step {} action '{}' does not match recorded type '{}'",
                entry.step, entry.action, step.step_type
            )),
            Some(_) => {}
        }
        if let Err(e) = entry.locator.validate() {
            problems.push(format!("override step {}: {}", entry.step, e));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(PilotError::Validation(problems.join("; ")))
    }
}

pub fn validate_assertions(recording: &Recording, entries: &[AssertionEntry]) -> Result<(), PilotError> {
    let mut problems = Vec::new();
    let action_count = recording.action_steps().len();
    for entry in entries {
        if entry.after_step >= action_count {
            problems.push(format!(
                "assertion afterStep {} is out of range (recording has {} action steps)",
                entry.after_step, action_count
            ));
        }
        if entry.expect.is_empty() {
            problems.push(format!("assertion afterStep {} has no checks", entry.after_step));
        }
        for check in &entry.expect {
            let blank = match check {
                AssertionCheck::UrlContains { value } | AssertionCheck::VisibleText { value } => value.trim().is_empty(),
                AssertionCheck::RoleVisible { role, .. } => role.trim().is_empty(),
            };
            if blank {
                problems.push(format!("assertion afterStep {} has an empty check", entry.after_step));
            }
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(PilotError::Validation(problems.join("; ")))
    }
}

/// Overrides keyed by `(step, action)`. Later duplicates win.
pub fn override_map(entries: &[OverrideEntry]) -> BTreeMap<(usize, String), Descriptor> {
    entries.iter().map(|e| (e.key(), e.locator.clone())).collect()
}

/// Assertions grouped by the step they follow, in file order.
pub fn assertion_map(entries: &[AssertionEntry]) -> BTreeMap<usize, Vec<AssertionCheck>> {
    let mut map: BTreeMap<usize, Vec<AssertionCheck>> = BTreeMap::new();
    for entry in entries {
        map.entry(entry.after_step).or_default().extend(entry.expect.iter().cloned());
    }
    map
}

/// Merge by `(step, action)`; entries from `incoming` replace existing ones.
/// The result is ordered by step, then action.
pub fn merge_overrides(existing: &[OverrideEntry], incoming: &[OverrideEntry]) -> Vec<OverrideEntry> {
    let mut merged: BTreeMap<(usize, String), OverrideEntry> = BTreeMap::new();
    for entry in existing.iter().chain(incoming) {
        merged.insert(entry.key(), entry.clone());
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> Recording {
        serde_json::from_value(json!({
            "title": "t",
            "steps": [
                {"type": "navigate", "url": "https://app.test"},
                {"type": "click", "selectors": [["aria/Login[role=\"button\"]"]]},
                {"type": "change", "value": "x", "selectors": [["#q"]]}
            ]
        })).unwrap()
    }

    fn entry(step: usize, action: &str, selector: &str) -> OverrideEntry {
        OverrideEntry { step, action: action.into(), locator: Descriptor::css(selector), note: None }
    }

    #[test]
    fn test_parse_override_shapes() {
        let single = r#"{"step": 1, "action": "click", "locator": {"kind": "css", "selector": ".btn"}}"#;
        assert_eq!(parse_overrides(single).unwrap(), vec![entry(1, "click", ".btn")]);
        let list = format!("[{}]", single);
        assert_eq!(parse_overrides(&list).unwrap().len(), 1);
        let file = format!("{{\"overrides\": [{}]}}", single);
        assert_eq!(parse_overrides(&file).unwrap().len(), 1);
    }

    #[test]
    fn test_valid_override() {
        assert!(validate_overrides(&recording(), &[entry(0, "click", ".btn"), entry(1, "change", "#q")]).is_ok());
    }

    #[test]
    fn test_navigate_is_not_counted() {
        let err = validate_overrides(&recording(), &[entry(2, "change", "#q")]).unwrap_err();
        assert!(err.to_string().contains("out of range (recording has 2 action steps)"));
    }

    #[test]
    fn test_out_of_range_override_rejected() {
        let err = validate_overrides(&recording(), &[entry(7, "click", ".btn")]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_mismatched_action_rejected() {
        let err = validate_overrides(&recording(), &[entry(1, "click", ".btn")]).unwrap_err();
        assert!(err.to_string().contains("does not match recorded type 'change'"));
    }

    #[test]
    fn test_all_problems_reported() {
        let err = validate_overrides(&recording(), &[entry(1, "click", ".a"), entry(9, "click", ".b")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("step 1") && msg.contains("step 9"));
    }

    #[test]
    fn test_assertions_parse_and_validate() {
        let entries = parse_assertions(r#"{"assertions": [{"afterStep": 1, "expect": [
            {"type": "url_contains", "value": "/home"},
            {"type": "role_visible", "role": "heading", "name": "Welcome"}
        ]}]}"#).unwrap();
        assert!(validate_assertions(&recording(), &entries).is_ok());
        assert_eq!(assertion_map(&entries)[&1].len(), 2);

        let bad = parse_assertions(r#"[{"afterStep": 2, "expect": [{"type": "visible_text", "value": "x"}]}]"#).unwrap();
        assert!(validate_assertions(&recording(), &bad).is_err());
    }

    #[test]
    fn test_merge_new_wins() {
        let existing = vec![entry(1, "click", ".old"), entry(2, "change", "#q")];
        let incoming = vec![entry(1, "click", ".new")];
        let merged = merge_overrides(&existing, &incoming);
        assert_eq!(merged, vec![entry(1, "click", ".new"), entry(2, "change", "#q")]);
    }

    #[test]
    fn test_schema_check() {
        assert!(check_override_schema(&json!({"overrides": [{"step": 1, "action": "click", "locator": {"kind": "css", "selector": "a"}}]})).is_ok());
        assert!(check_override_schema(&json!({"overrides": [{"step": -1, "action": "click"}]})).is_err());
    }

    #[test]
    fn test_sidecar_paths() {
        let (o, a) = sidecar_paths(Path::new("/rec/login.json"));
        assert_eq!(o, PathBuf::from("/rec/login.overrides.json"));
        assert_eq!(a, PathBuf::from("/rec/login.assertions.json"));
        assert!(is_sidecar(&o));
        assert!(!is_sidecar(Path::new("/rec/login.json")));
    }
}
