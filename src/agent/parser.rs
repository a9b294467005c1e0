use std::sync::LazyLock;
use regex::Regex;
use serde_json::Value;
use crate::errors::PilotError;
use super::action::Action;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*\s*\n?(.*?)```").expect("fenced block regex is valid")
});

/// Candidate JSON objects found in free text, most likely first: the whole
/// text, fenced code blocks, then every balanced `{...}` span.
pub fn json_object_candidates(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    let mut push = |v: Value| {
        if v.is_object() && !out.contains(&v) {
            out.push(v);
        }
    };

    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        push(v);
    }
    for cap in FENCED_BLOCK.captures_iter(text) {
        if let Ok(v) = serde_json::from_str::<Value>(cap[1].trim()) {
            push(v);
        }
    }
    for span in balanced_spans(text) {
        if let Ok(v) = serde_json::from_str::<Value>(span) {
            push(v);
        }
    }
    out
}

/// First JSON object in `text`, if any.
pub fn extract_json_object(text: &str) -> Option<Value> {
    json_object_candidates(text).into_iter().next()
}

/// Outermost `{...}` spans, ignoring braces inside string literals.
fn balanced_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

/// Turn raw model output into exactly one validated action. The first
/// candidate object that validates wins.
pub fn parse_action(raw: &str, max_wait_ms: u64) -> Result<Action, PilotError> {
    let candidates = json_object_candidates(raw);
    if candidates.is_empty() {
        return Err(PilotError::OutputValidation(format!(
            "no JSON object in model output: {}",
            preview(raw)
        )));
    }

    let mut last_error = String::new();
    for candidate in candidates {
        match serde_json::from_value::<Action>(candidate) {
            Ok(action) => match action.validated(max_wait_ms) {
                Ok(action) => return Ok(action),
                Err(e) => last_error = e.to_string(),
            },
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(PilotError::OutputValidation(format!("model output is not a valid action: {}", last_error)))
}

fn preview(raw: &str) -> String {
    let flat: String = raw.chars().take(120).collect();
    flat.replace('\n', " ")
}
