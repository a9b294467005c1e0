use crate::browser::locator::{js_str, Descriptor};
use super::sidecars::AssertionCheck;
use super::types::{RecordedStep, StepKind};

const INDENT: &str = "  ";

/// File header marking the script as generated.
pub fn header(source: &str, overrides_file: &str) -> String {
    format!(
        "// Generated by webpilot from {}. Do not edit by hand.\n\
         // Regenerate with `webpilot generate`; put locator fixes in {}.\n\
         import {{ test, expect }} from '@playwright/test';\n",
        source, overrides_file
    )
}

pub fn open_test(title: &str) -> String {
    format!("\ntest({}, async ({{ page }}) => {{\n", js_str(title))
}

pub fn close_test() -> &'static str {
    "});\n"
}

fn line(code: &str) -> String {
    format!("{}{}\n", INDENT, code)
}

fn number(v: Option<f64>) -> String {
    let v = v.unwrap_or(0.0);
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn comment(index: Option<usize>, note: &str) -> String {
    match index {
        Some(index) => line(&format!("// step {}: {}", index, note)),
        None => line(&format!("// {}", note)),
    }
}

/// Replay code for one recorded step. `index` is the action number, `None`
/// for setup steps. `target` is the locator chosen for element steps.
/// Steps that cannot be replayed become a comment.
pub fn step_code(index: Option<usize>, step: &RecordedStep, target: Option<&Descriptor>) -> String {
    let mut out = comment(index, &step.step_type);
    let loc = target.map(Descriptor::to_code);

    let body = match (step.kind(), loc.as_deref()) {
        (StepKind::Navigate, _) => match &step.url {
            Some(url) => format!("await page.goto({});", js_str(url)),
            None => return out + &comment(index, "navigate without url skipped"),
        },
        (StepKind::Click, Some(loc)) => format!("await {}.click();", loc),
        (StepKind::DoubleClick, Some(loc)) => format!("await {}.dblclick();", loc),
        (StepKind::Change, Some(loc)) => {
            format!("await {}.fill({});", loc, js_str(step.value.as_deref().unwrap_or_default()))
        }
        (StepKind::Hover, Some(loc)) => format!("await {}.hover();", loc),
        (StepKind::WaitForElement, Some(loc)) => match (step.count, step.visible) {
            (Some(n), _) => format!("await expect({}).toHaveCount({});", loc, n),
            (None, Some(false)) => format!("await expect({}.first()).toBeHidden();", loc),
            _ => format!("await expect({}.first()).toBeVisible();", loc),
        },
        (StepKind::KeyDown, _) => match &step.key {
            Some(key) => format!("await page.keyboard.down({});", js_str(key)),
            None => return out + &comment(index, "keyDown without key skipped"),
        },
        (StepKind::KeyUp, _) => match &step.key {
            Some(key) => format!("await page.keyboard.up({});", js_str(key)),
            None => return out + &comment(index, "keyUp without key skipped"),
        },
        (StepKind::Scroll, _) => format!(
            "await page.evaluate(([x, y]) => window.scrollTo(x, y), [{}, {}]);",
            number(step.x),
            number(step.y)
        ),
        (StepKind::SetViewport, _) => match (step.width, step.height) {
            (Some(w), Some(h)) => format!("await page.setViewportSize({{ width: {}, height: {} }});", w, h),
            _ => return out + &comment(index, "setViewport without size skipped"),
        },
        (StepKind::WaitForExpression, _) => match &step.expression {
            Some(expr) => format!("await page.waitForFunction({});", js_str(expr)),
            None => return out + &comment(index, "waitForExpression without expression skipped"),
        },
        (StepKind::CustomStep, _) => {
            let name = step.name.as_deref().unwrap_or("unnamed");
            return out + &comment(index, &format!("custom step {} has no replay equivalent", js_str(name)));
        }
        (StepKind::Unknown, _) => {
            return out + &comment(index, &format!("unsupported step type {} skipped", js_str(&step.step_type)));
        }
        (_, None) => return out + &comment(index, "no locator available"),
    };
    out.push_str(&line(&body));
    out
}

/// Expectation checks injected after a step.
pub fn assertion_code(after_step: usize, checks: &[AssertionCheck]) -> String {
    let mut out = line(&format!("// assertions after step {}", after_step));
    for check in checks {
        let code = match check {
            AssertionCheck::UrlContains { value } => format!(
                "await expect(page).toHaveURL(new RegExp({}));",
                js_str(&regex::escape(value))
            ),
            AssertionCheck::VisibleText { value } => format!(
                "await expect({}.first()).toBeVisible();",
                Descriptor::Text { text: value.clone(), exact: false }.to_code()
            ),
            AssertionCheck::RoleVisible { role, name } => format!(
                "await expect({}.first()).toBeVisible();",
                Descriptor::role(role, name.as_deref(), false).to_code()
            ),
        };
        out.push_str(&line(&code));
    }
    out
}
