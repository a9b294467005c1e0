mod common;

use std::fs;
use serde_json::json;
use tempfile::TempDir;
use webpilot::browser::locator::Descriptor;
use webpilot::config::AppConfig;
use webpilot::errors::PilotError;
use webpilot::recording::sidecars::load_overrides;
use webpilot::review::{OverrideReviewer, ReviewRequest, ReviewSource};
use common::{provider, ScriptedProvider};

const FAILURE: &str = "Replay failed at step 1: click\nURL: https://app.test/login\nTitle: Login\n\n- main\n  - heading \"Welcome back\"\n  - button \"Sign in\"\n";

struct Fixture {
    _tmp: TempDir,
    request: ReviewRequest,
}

fn fixture(existing: Option<serde_json::Value>) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let recording = tmp.path().join("login.json");
    fs::write(&recording, json!({
        "title": "Login",
        "steps": [
            {"type": "navigate", "url": "https://app.test/login"},
            {"type": "change", "value": "demo", "selectors": [["aria/Username"]]},
            {"type": "click", "selectors": [["aria/Log in[role=\"button\"]"], ["#login"]]}
        ]
    }).to_string()).unwrap();
    if let Some(existing) = existing {
        fs::write(tmp.path().join("login.overrides.json"), existing.to_string()).unwrap();
    }
    let failure = tmp.path().join("step-0-failure.txt");
    fs::write(&failure, FAILURE).unwrap();
    Fixture {
        request: ReviewRequest { recording, failure, overrides: None, dry_run: false },
        _tmp: tmp,
    }
}

fn reviewer(replies: Vec<&str>) -> OverrideReviewer {
    let (_, llm) = provider(ScriptedProvider::new(replies));
    OverrideReviewer::new(llm, &AppConfig::default())
}

#[tokio::test]
async fn test_model_overrides_written() {
    let fx = fixture(None);
    let reply = r#"{"suggested_overrides": [{"step": 1, "action": "click", "locator": {"kind": "role", "role": "button", "name": "Sign in", "exact": true}, "note": "renamed"}]}"#;

    let outcome = reviewer(vec![reply]).review(&fx.request).await.unwrap();

    assert_eq!(outcome.source, ReviewSource::Model);
    let path = outcome.written.unwrap();
    let saved = load_overrides(&path).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].locator, Descriptor::role("button", Some("Sign in"), true));
}

#[tokio::test]
async fn test_invalid_model_reply_falls_back_to_heuristic() {
    let fx = fixture(None);
    let reply = r#"{"overrides": [{"step": 0, "action": "click", "locator": {"kind": "css", "selector": ".x"}}]}"#;

    let outcome = reviewer(vec![reply]).review(&fx.request).await.unwrap();

    assert_eq!(outcome.source, ReviewSource::Heuristic);
    assert_eq!(outcome.proposed.len(), 1);
    assert_eq!(outcome.proposed[0].step, 1);
    assert_eq!(outcome.proposed[0].locator, Descriptor::role("button", Some("Sign in"), false));
}

#[tokio::test]
async fn test_empty_model_reply_falls_back_to_heuristic() {
    let fx = fixture(None);
    let outcome = reviewer(vec![r#"{"overrides": []}"#]).review(&fx.request).await.unwrap();
    assert_eq!(outcome.source, ReviewSource::Heuristic);
}

#[tokio::test]
async fn test_model_error_falls_back_to_heuristic() {
    let fx = fixture(None);
    let (_, llm) = provider(ScriptedProvider::with_results(
        vec![Err(PilotError::Network("connection refused".into()))],
        "{}",
    ));
    let outcome = OverrideReviewer::new(llm, &AppConfig::default()).review(&fx.request).await.unwrap();
    assert_eq!(outcome.source, ReviewSource::Heuristic);
}

#[tokio::test]
async fn test_merge_keeps_existing_and_new_wins() {
    let fx = fixture(Some(json!({"overrides": [
        {"step": 0, "action": "change", "locator": {"kind": "label", "text": "User"}},
        {"step": 1, "action": "click", "locator": {"kind": "css", "selector": "#old"}}
    ]})));
    let reply = r#"{"overrides": [{"step": 1, "action": "click", "locator": {"kind": "testid", "value": "sign-in"}}]}"#;

    let outcome = reviewer(vec![reply]).review(&fx.request).await.unwrap();

    assert_eq!(outcome.merged.len(), 2);
    let saved = load_overrides(&outcome.written.unwrap()).await.unwrap();
    assert_eq!(saved[0].step, 0);
    assert_eq!(saved[1].locator, Descriptor::TestId { value: "sign-in".into() });
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let mut fx = fixture(None);
    fx.request.dry_run = true;
    let reply = r#"{"overrides": [{"step": 1, "action": "click", "locator": {"kind": "text", "text": "Sign in"}}]}"#;

    let outcome = reviewer(vec![reply]).review(&fx.request).await.unwrap();

    assert!(outcome.written.is_none());
    assert_eq!(outcome.merged.len(), 1);
    assert!(!fx.request.recording.with_file_name("login.overrides.json").exists());
}

#[tokio::test]
async fn test_nothing_to_propose_is_error() {
    let fx = fixture(None);
    fs::write(&fx.request.failure, "the page crashed").unwrap();

    let err = reviewer(vec!["no idea"]).review(&fx.request).await.unwrap_err();

    assert!(matches!(err, PilotError::Review(_)));
}
