mod common;

use common::{fast_config, provider, FakePage, ScriptedProvider};
use webpilot::agent::{ActionOutcome, AgentRunner, Expectation, StepSpec};
use webpilot::browser::locator::Descriptor;
use webpilot::errors::PilotError;

const GOTO_DASHBOARD: &str = r#"{"action": "goto", "url": "/dashboard"}"#;
const CLICK_MISSING: &str = r#"{"action": "click", "locator": {"kind": "role", "role": "button", "name": "Nope"}}"#;

fn dashboard_step() -> StepSpec {
    StepSpec::new(0, "Open the dashboard", vec![Expectation::url_contains("/dashboard")])
}

#[tokio::test]
async fn test_goto_meets_expectation_on_second_tick() {
    let (scripted, llm) = provider(ScriptedProvider::new(vec![CLICK_MISSING, GOTO_DASHBOARD]));
    let runner = AgentRunner::new(llm, fast_config(5));
    let page = FakePage::new("https://app.test/login");

    let result = runner.run_step(&page, &dashboard_step()).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.ticks_used, 2);
    assert_eq!(scripted.calls(), 2);
    assert_eq!(page.current_url(), "https://app.test/dashboard");
    assert_eq!(result.actions[0].outcome, ActionOutcome::Failed);
    assert_eq!(result.actions[1].outcome, ActionOutcome::Ok);
    assert!(result.expectations.iter().all(|e| e.passed));
    assert!(result.debug.is_none());
}

#[tokio::test]
async fn test_failed_action_error_reaches_next_prompt() {
    let (scripted, llm) = provider(ScriptedProvider::new(vec![CLICK_MISSING, GOTO_DASHBOARD]));
    let runner = AgentRunner::new(llm, fast_config(5));
    let page = FakePage::new("https://app.test/login");

    runner.run_step(&page, &dashboard_step()).await;

    let prompts = scripted.prompts();
    assert!(prompts[0].contains("## Last error\nnone"));
    assert!(prompts[1].contains("Element not found"));
}

#[tokio::test]
async fn test_malformed_output_exhausts_budget() {
    let (scripted, llm) = provider(ScriptedProvider::repeating("I would click the login button now."));
    let runner = AgentRunner::new(llm, fast_config(4));
    let page = FakePage::new("https://app.test/login");

    let result = runner.run_step(&page, &dashboard_step()).await;

    assert!(!result.success);
    assert_eq!(scripted.calls(), 4);
    assert_eq!(result.ticks_used, 4);
    assert_eq!(result.executed_actions(), 0);
    assert!(result.actions.iter().all(|a| a.outcome == ActionOutcome::ParseError));
    let error = result.error.unwrap();
    assert!(error.contains("tick budget exhausted"), "{}", error);
    assert!(error.contains("url_contains \"/dashboard\""));
    let debug = result.debug.unwrap();
    assert_eq!(debug.raw_response.as_deref(), Some("I would click the login button now."));
    assert!(debug.observation.is_some());
    assert!(page.log().is_empty());
}

#[tokio::test]
async fn test_no_expectations_passes_on_exhaustion() {
    let (scripted, llm) = provider(ScriptedProvider::repeating(r#"{"action": "wait", "ms": 1}"#));
    let runner = AgentRunner::new(llm, fast_config(3));
    let page = FakePage::new("https://app.test/");

    let result = runner.run_step(&page, &StepSpec::new(0, "Look around", Vec::new())).await;

    assert!(result.success);
    assert_eq!(result.ticks_used, 3);
    assert_eq!(scripted.calls(), 3);
    assert_eq!(result.executed_actions(), 3);
}

#[tokio::test]
async fn test_step_tick_override() {
    let (scripted, llm) = provider(ScriptedProvider::repeating("nonsense"));
    let runner = AgentRunner::new(llm, fast_config(10));
    let page = FakePage::new("https://app.test/");
    let mut step = dashboard_step();
    step.max_ticks = Some(2);

    let result = runner.run_step(&page, &step).await;

    assert!(!result.success);
    assert_eq!(scripted.calls(), 2);
}

#[tokio::test]
async fn test_fail_action_ends_step() {
    let (scripted, llm) = provider(ScriptedProvider::new(vec![
        r#"{"action": "fail", "reason": "login form is missing"}"#,
        GOTO_DASHBOARD,
    ]));
    let runner = AgentRunner::new(llm, fast_config(5));
    let page = FakePage::new("https://app.test/login");

    let result = runner.run_step(&page, &dashboard_step()).await;

    assert!(!result.success);
    assert_eq!(scripted.calls(), 1);
    assert_eq!(result.ticks_used, 1);
    assert_eq!(result.actions[0].outcome, ActionOutcome::Aborted);
    assert!(result.error.unwrap().contains("login form is missing"));
    assert!(result.debug.is_some());
    assert!(page.log().is_empty());
}

#[tokio::test]
async fn test_model_error_is_recorded_and_loop_continues() {
    let (_, llm) = provider(ScriptedProvider::with_results(
        vec![Err(PilotError::LLMApi("upstream 500".into())), Ok(GOTO_DASHBOARD.to_string())],
        "{}",
    ));
    let runner = AgentRunner::new(llm, fast_config(5));
    let page = FakePage::new("https://app.test/login");

    let result = runner.run_step(&page, &dashboard_step()).await;

    assert!(result.success);
    assert_eq!(result.ticks_used, 2);
    assert_eq!(result.actions[0].outcome, ActionOutcome::ModelError);
    assert!(result.actions[0].detail.contains("upstream 500"));
}

#[tokio::test]
async fn test_assert_does_not_touch_page() {
    let (_, llm) = provider(ScriptedProvider::new(vec![
        r#"{"action": "assert", "expect": {"type": "visible_text", "value": "Welcome"}}"#,
        r#"{"action": "assert", "expect": {"type": "visible_text", "value": "Goodbye"}}"#,
        GOTO_DASHBOARD,
    ]));
    let runner = AgentRunner::new(llm, fast_config(5));
    let page = FakePage::new("https://app.test/login").with_text("Welcome back");

    let result = runner.run_step(&page, &dashboard_step()).await;

    assert!(result.success);
    assert_eq!(result.ticks_used, 3);
    assert_eq!(result.actions[0].outcome, ActionOutcome::AssertPassed);
    assert_eq!(result.actions[1].outcome, ActionOutcome::AssertFailed);
    assert_eq!(page.log(), vec!["goto https://app.test/dashboard".to_string()]);
}

#[tokio::test]
async fn test_click_navigation_meets_expectation() {
    let reply = r#"Sure. ```json
{"action": "click", "locator": {"kind": "role", "role": "button", "name": "Sign in"}}
```"#;
    let (_, llm) = provider(ScriptedProvider::new(vec![reply]));
    let runner = AgentRunner::new(llm, fast_config(5));
    let page = FakePage::new("https://app.test/login")
        .with_element(Descriptor::role("button", Some("Sign in"), false), Some("https://app.test/dashboard"));

    let result = runner.run_step(&page, &dashboard_step()).await;

    assert!(result.success);
    assert_eq!(result.ticks_used, 1);
    assert_eq!(result.executed_actions(), 1);
}

#[tokio::test]
async fn test_locator_visible_expectation() {
    let (_, llm) = provider(ScriptedProvider::new(vec![
        r#"{"action": "press", "key": "Enter"}"#,
    ]));
    let runner = AgentRunner::new(llm, fast_config(3));
    let page = FakePage::new("https://app.test/")
        .with_element(Descriptor::TestId { value: "toast".into() }, None);
    let step = StepSpec::new(
        1,
        "Submit the form",
        vec![Expectation::locator_visible(Descriptor::TestId { value: "toast".into() })],
    );

    let result = runner.run_step(&page, &step).await;

    assert!(result.success);
    assert_eq!(result.ticks_used, 1);
    assert_eq!(page.log(), vec!["press Enter".to_string()]);
}
