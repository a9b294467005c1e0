use super::expectations::Expectation;
use super::observation::Observation;

pub const SYSTEM_INSTRUCTION: &str = r#"You are a browser test agent. You receive a goal, the expected end state, and a snapshot of the current page. Choose exactly ONE next action that moves the page toward the goal.

Reply with a single JSON object and nothing else. The "action" field selects the shape:

{"action":"click","locator":LOCATOR}
{"action":"fill","locator":LOCATOR,"text":"..."}
{"action":"press","key":"Enter","locator":LOCATOR}          (locator optional)
{"action":"select","locator":LOCATOR,"value":"..."}
{"action":"check","locator":LOCATOR,"checked":true}
{"action":"wait","ms":1000}
{"action":"goto","url":"https://... or /relative/path"}
{"action":"assert","expect":{"type":"url_contains|visible_text|locator_visible","value":"...","locator":LOCATOR}}
{"action":"fail","reason":"why the goal cannot be reached"}

LOCATOR is one of:
{"kind":"role","role":"button","name":"Sign in","exact":true}
{"kind":"label","text":"Email"}
{"kind":"testid","value":"submit"}
{"kind":"text","text":"Forgot password?"}
{"kind":"css","selector":"form .submit"}
{"kind":"active"}

Rules:
- Prefer role locators with the accessible name shown in the accessibility tree, then label, then text. Use css only as a last resort.
- Do not repeat an action that already failed; read the last error and history.
- Use "fail" only when the goal is clearly impossible on this site."#;

/// Per-tick user payload: goal, expectations, budget and page state.
pub fn build_tick_prompt(goal: &str, expectations: &[Expectation], max_ticks: u32, observation: &Observation) -> String {
    let mut out = String::with_capacity(observation.ax_tree.len() + observation.visible_text.len() + 1024);

    out.push_str("## Goal\n");
    out.push_str(goal);
    out.push_str("\n\n## Expected end state\n");
    if expectations.is_empty() {
        out.push_str("(none declared; stop changing the page once the goal is done)\n");
    } else {
        for e in expectations {
            out.push_str("- ");
            out.push_str(&e.describe());
            out.push('\n');
        }
    }

    out.push_str(&format!("\n## Tick\n{} of {}\n", observation.tick, max_ticks));
    out.push_str(&format!("\n## Page\nURL: {}\nTitle: {}\n", observation.url, observation.title));

    out.push_str("\n## Last error\n");
    out.push_str(observation.last_error.as_deref().unwrap_or("none"));
    out.push('\n');

    out.push_str("\n## Recent actions\n");
    if observation.history.is_empty() {
        out.push_str("(none)\n");
    } else {
        for record in &observation.history {
            out.push_str("- ");
            out.push_str(&record.summary());
            out.push('\n');
        }
    }

    out.push_str("\n## Accessibility tree\n");
    out.push_str(&observation.ax_tree);
    out.push_str("\n\n## Visible text\n");
    out.push_str(&observation.visible_text);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> Observation {
        Observation {
            tick: 3,
            url: "https://app.test/login".into(),
            title: "Login".into(),
            ax_tree: "- button \"Sign in\"".into(),
            visible_text: "Sign in".into(),
            last_error: Some("Element not found: link \"Help\"".into()),
            history: Vec::new(),
        }
    }

    #[test]
    fn test_prompt_contains_state() {
        let prompt = build_tick_prompt("Sign in", &[Expectation::url_contains("/home")], 25, &observation());
        assert!(prompt.contains("3 of 25"));
        assert!(prompt.contains("url_contains \"/home\""));
        assert!(prompt.contains("https://app.test/login"));
        assert!(prompt.contains("Element not found"));
        assert!(prompt.contains("button \"Sign in\""));
    }

    #[test]
    fn test_system_instruction_lists_every_action() {
        for action in ["click", "fill", "press", "select", "check", "wait", "goto", "assert", "fail"] {
            assert!(SYSTEM_INSTRUCTION.contains(&format!("\"action\":\"{}\"", action)));
        }
    }
}
