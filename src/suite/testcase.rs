use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use crate::agent::expectations::Expectation;
use crate::config::schema::schema_violations;
use crate::errors::PilotError;
use tracing::{error, info};

pub static TESTCASE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["id", "name", "baseUrl", "steps"],
        "properties": {
            "id": { "type": "string", "minLength": 1 },
            "name": { "type": "string", "minLength": 1 },
            "baseUrl": { "type": "string", "minLength": 1 },
            "variables": {
                "type": "object",
                "additionalProperties": { "type": ["string", "number", "boolean"] }
            },
            "steps": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["goal"],
                    "properties": {
                        "goal": { "type": "string", "minLength": 1 },
                        "maxTicks": { "type": "integer", "minimum": 1 },
                        "expect": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["type"],
                                "properties": {
                                    "type": { "enum": ["url_contains", "visible_text", "locator_visible"] },
                                    "value": { "type": "string" },
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
                }
            }
        }
    })
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(default, deserialize_with = "scalar_map")]
    pub variables: BTreeMap<String, String>,
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub goal: String,
    #[serde(default)]
    pub expect: Vec<Expectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u32>,
}

/// Variables may be written as numbers or booleans in YAML; they are all
/// strings once loaded.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k, s)),
            Value::Number(n) => Ok((k, n.to_string())),
            Value::Bool(b) => Ok((k, b.to_string())),
            other => Err(serde::de::Error::custom(format!("variable '{}' must be a scalar, got {}", k, other))),
        })
        .collect()
}

/// A test case together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedCase {
    pub path: PathBuf,
    pub case: TestCase,
}

/// Result of loading a batch of test-case files. Invalid files are listed
/// with their reason, never fatal to the batch.
#[derive(Debug, Default)]
pub struct LoadedSuite {
    pub cases: Vec<LoadedCase>,
    pub invalid: Vec<String>,
}

pub fn parse_test_case(content: &str) -> Result<TestCase, PilotError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| PilotError::TestCase(format!("invalid YAML: {}", e)))?;
    let json_value = serde_json::to_value(&yaml)
        .map_err(|e| PilotError::TestCase(format!("unsupported YAML content: {}", e)))?;

    let violations = schema_violations(&TESTCASE_SCHEMA, &json_value).map_err(PilotError::Internal)?;
    if !violations.is_empty() {
        return Err(PilotError::TestCase(violations.join("; ")));
    }

    let case: TestCase = serde_json::from_value(json_value)
        .map_err(|e| PilotError::TestCase(e.to_string()))?;
    for (i, step) in case.steps.iter().enumerate() {
        for expectation in &step.expect {
            expectation.validate()
                .map_err(|e| PilotError::TestCase(format!("step {}: {}", i, e)))?;
        }
    }
    Ok(case)
}

pub async fn load_test_case(path: &Path) -> Result<TestCase, PilotError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_test_case(&content)
}

/// Expand files and directories into a sorted list of YAML test-case paths.
pub fn collect_case_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PilotError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for ext in ["yaml", "yml"] {
                let pattern = input.join(format!("*.{}", ext));
                let pattern = pattern.to_string_lossy();
                let entries = glob::glob(&pattern)
                    .map_err(|e| PilotError::TestCase(format!("bad path {}: {}", input.display(), e)))?;
                files.extend(entries.filter_map(Result::ok));
            }
        } else if input.exists() {
            files.push(input.clone());
        } else {
            return Err(PilotError::TestCase(format!("no such file or directory: {}", input.display())));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Load every test case; files that fail to parse or validate are logged
/// and skipped.
pub async fn load_suite(inputs: &[PathBuf]) -> Result<LoadedSuite, PilotError> {
    let mut suite = LoadedSuite::default();
    for path in collect_case_files(inputs)? {
        match load_test_case(&path).await {
            Ok(case) => suite.cases.push(LoadedCase { path, case }),
            Err(e) => {
                error!(file = %path.display(), error = %e, "Skipping invalid test case");
                suite.invalid.push(format!("{}: {}", path.display(), e));
            }
        }
    }
    info!(valid = suite.cases.len(), invalid = suite.invalid.len(), "Test cases loaded");
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::expectations::ExpectationKind;

    const LOGIN: &str = r#"
id: login
name: Login works
baseUrl: https://app.test
variables:
  USER: demo
  PIN: 1234
steps:
  - goal: Log in as {{USER}} with pin {{PIN}}
    expect:
      - type: url_contains
        value: /dashboard
  - goal: Open settings
    maxTicks: 5
"#;

    #[test]
    fn test_parse_valid_case() {
        let case = parse_test_case(LOGIN).unwrap();
        assert_eq!(case.id, "login");
        assert_eq!(case.base_url, "https://app.test");
        assert_eq!(case.variables.get("PIN").map(String::as_str), Some("1234"));
        assert_eq!(case.steps.len(), 2);
        assert_eq!(case.steps[0].expect[0].kind, ExpectationKind::UrlContains);
        assert_eq!(case.steps[1].max_ticks, Some(5));
    }

    #[test]
    fn test_missing_base_url_rejected() {
        let err = parse_test_case("id: x\nname: y\nsteps:\n  - goal: z\n").unwrap_err();
        assert!(matches!(err, PilotError::TestCase(_)));
        assert!(err.to_string().contains("baseUrl"));
    }

    #[test]
    fn test_empty_steps_rejected() {
        assert!(parse_test_case("id: x\nname: y\nbaseUrl: http://a\nsteps: []\n").is_err());
    }

    #[test]
    fn test_unknown_expectation_type_rejected() {
        let yaml = "id: x\nname: y\nbaseUrl: http://a\nsteps:\n  - goal: z\n    expect:\n      - type: title_is\n        value: a\n";
        assert!(parse_test_case(yaml).is_err());
    }

    #[test]
    fn test_blank_expectation_value_rejected() {
        let yaml = "id: x\nname: y\nbaseUrl: http://a\nsteps:\n  - goal: z\n    expect:\n      - type: visible_text\n        value: ''\n";
        assert!(parse_test_case(yaml).is_err());
    }

    #[tokio::test]
    async fn test_load_suite_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_login.yaml"), LOGIN).unwrap();
        std::fs::write(dir.path().join("b_broken.yml"), "id: [unterminated").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let suite = load_suite(&[dir.path().to_path_buf()]).await.unwrap();
        assert_eq!(suite.cases.len(), 1);
        assert_eq!(suite.invalid.len(), 1);
        assert!(suite.invalid[0].contains("b_broken.yml"));
    }

    #[test]
    fn test_missing_input_is_error() {
        assert!(collect_case_files(&[PathBuf::from("/nonexistent/cases")]).is_err());
    }
}
