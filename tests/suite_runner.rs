mod common;

use std::path::PathBuf;
use tempfile::TempDir;
use common::{fast_config, provider, FakePage, ScriptedProvider};
use webpilot::browser::locator::Descriptor;
use webpilot::suite::testcase::parse_test_case;
use webpilot::suite::{LoadedCase, SuiteRunner};

const CASE: &str = r#"
id: login
name: Login and settings
baseUrl: https://app.test/login
variables:
  USER: demo
  PASS: hunter2
steps:
  - goal: Sign in as {{USER}} with password {{PASS}}
    expect:
      - type: url_contains
        value: /dashboard
  - goal: Open settings
    maxTicks: 2
    expect:
      - type: visible_text
        value: Settings
  - goal: Log out
"#;

fn loaded() -> LoadedCase {
    LoadedCase { path: PathBuf::from("cases/login.yaml"), case: parse_test_case(CASE).unwrap() }
}

#[tokio::test]
async fn test_case_stops_at_first_failure_and_masks_secrets() {
    let tmp = TempDir::new().unwrap();
    let (scripted, llm) = provider(ScriptedProvider::new(vec![
        r#"{"action": "fill", "locator": {"kind": "label", "text": "Password"}, "text": "hunter2"}"#,
        r#"{"action": "goto", "url": "/dashboard"}"#,
    ]));
    let runner = SuiteRunner::new(llm, fast_config(5), tmp.path().to_path_buf());
    let page = FakePage::new("about:blank")
        .with_element(Descriptor::Label { text: "Password".into(), exact: false }, None);

    let result = runner.run_case_on(&page, &loaded()).await;

    assert!(!result.success);
    assert_eq!(result.steps.len(), 2);
    assert!(result.steps[0].success);
    assert_eq!(result.steps[0].ticks_used, 2);
    assert!(!result.steps[1].success);
    assert_eq!(result.skipped_steps, vec!["Log out".to_string()]);
    assert_eq!(scripted.calls(), 4);

    // The model sees real values; everything persisted is masked.
    assert!(scripted.prompts()[0].contains("hunter2"));
    assert_eq!(result.steps[0].goal, "Sign in as [MASKED] with password [MASKED]");
    let json = serde_json::to_string(&result).unwrap();
    assert!(!json.contains("hunter2"), "{}", json);

    assert_eq!(page.viewport(), Some((1280, 800)));
    assert_eq!(page.log()[0], "goto https://app.test/login");
    assert_eq!(page.log()[1], "fill hunter2");

    let failure = std::fs::read_to_string(tmp.path().join("login").join("step-1-failure.txt")).unwrap();
    assert!(failure.contains("tick budget exhausted"));
    assert!(failure.contains("URL: https://app.test/dashboard"));
}

#[tokio::test]
async fn test_all_steps_pass() {
    let tmp = TempDir::new().unwrap();
    let (_, llm) = provider(ScriptedProvider::new(vec![
        r#"{"action": "goto", "url": "/dashboard"}"#,
        r#"{"action": "click", "locator": {"kind": "text", "text": "Settings"}}"#,
        r#"{"action": "press", "key": "Escape"}"#,
    ]));
    let runner = SuiteRunner::new(llm, fast_config(1), tmp.path().to_path_buf());
    let page = FakePage::new("about:blank").with_text("Settings");

    let result = runner.run_case_on(&page, &loaded()).await;

    assert!(result.success, "{:?}", result.failed_step().map(|s| &s.error));
    assert_eq!(result.steps.len(), 3);
    assert!(result.skipped_steps.is_empty());
    assert!(!tmp.path().join("login").exists());
}

#[tokio::test]
async fn test_values_echoed_by_page_are_masked_on_disk() {
    let tmp = TempDir::new().unwrap();
    let (_, llm) = provider(ScriptedProvider::new(vec![
        r#"{"action": "fill", "locator": {"kind": "label", "text": "Password"}, "text": "hunter2"}"#,
    ]));
    let runner = SuiteRunner::new(llm, fast_config(2), tmp.path().to_path_buf());
    let page = FakePage::new("about:blank")
        .with_element(Descriptor::Label { text: "Password".into(), exact: false }, None)
        .with_tree("- main\n  - textbox \"User\": demo\n  - textbox \"Password\": hunter2")
        .with_text("Signed in as demo");

    let result = runner.run_case_on(&page, &loaded()).await;

    assert!(!result.success);
    let json = serde_json::to_string(&result).unwrap();
    assert!(!json.contains("hunter2"), "{}", json);
    assert!(!json.contains("demo"), "{}", json);

    let failure = std::fs::read_to_string(tmp.path().join("login").join("step-0-failure.txt")).unwrap();
    assert!(failure.starts_with("Test step 0: "));
    assert!(failure.contains("textbox \"Password\": [MASKED]"), "{}", failure);
    assert!(!failure.contains("hunter2") && !failure.contains("demo"), "{}", failure);
}
