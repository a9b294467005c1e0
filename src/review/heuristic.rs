//! Deterministic override guess used when the model cannot help.

use std::sync::LazyLock;
use regex::Regex;
use crate::browser::locator::Descriptor;
use crate::recording::sidecars::OverrideEntry;
use crate::recording::types::{RecordedStep, Recording, StepKind};
use tracing::debug;

/// `step N: type`. A preceding `test` marks a test-case step from a run's
/// failure snapshot header, which never names a recording step.
static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\btest\s+)?\bstep\s*#?\s*(\d+)\s*[:(\-]\s*([A-Za-z]+)").expect("step marker regex is valid")
});

static ROLE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\b(button|link|textbox|checkbox|radio|combobox|menuitem|tab|option|heading|searchbox|switch|listbox)"#,
        r#"\s*:?\s*"([^"\n]+)""#
    ))
    .expect("role mention regex is valid")
});

const CLICKABLE_ROLES: &[&str] = &["button", "link", "menuitem", "tab", "checkbox", "radio", "switch", "option"];
const INPUT_ROLES: &[&str] = &["textbox", "searchbox", "combobox"];

const SCORE_CLICKABLE_STEP: i32 = 2;
const SCORE_OTHER_STEP: i32 = 1;
const SCORE_EXACT_NAME: i32 = 10;
const SCORE_PARTIAL_NAME: i32 = 4;
const SCORE_ROLE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub role: String,
    pub name: String,
}

/// Role and accessible-name pairs mentioned in a failure snapshot, in order,
/// without duplicates.
pub fn extract_mentions(text: &str) -> Vec<Mention> {
    let mut out: Vec<Mention> = Vec::new();
    for caps in ROLE_MENTION.captures_iter(text) {
        let mention = Mention { role: caps[1].to_string(), name: caps[2].trim().to_string() };
        if !mention.name.is_empty() && !out.contains(&mention) {
            out.push(mention);
        }
    }
    out
}

/// Action step named by an explicit `step N: type` marker, when it exists
/// in the recording with that type.
fn marked_step(recording: &Recording, failure: &str) -> Option<usize> {
    STEP_MARKER.captures_iter(failure).find_map(|caps| {
        if caps.get(1).is_some() {
            return None;
        }
        let index: usize = caps[2].parse().ok()?;
        let step = recording.action_step(index)?;
        step.step_type.eq_ignore_ascii_case(&caps[3]).then_some(index)
    })
}

fn names_match_partially(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

/// Score element steps against the mentions. Clickable steps rank above
/// others; an exact recorded ARIA name match ranks highest.
fn score_step(step: &RecordedStep, mentions: &[Mention]) -> i32 {
    let base = if step.kind().is_clickable() { SCORE_CLICKABLE_STEP } else { SCORE_OTHER_STEP };
    let Some((role, name)) = step.aria_target() else {
        return 0;
    };
    let mut best = 0;
    for m in mentions {
        let mut s = if m.name == name {
            SCORE_EXACT_NAME
        } else if names_match_partially(&m.name, &name) {
            SCORE_PARTIAL_NAME
        } else {
            0
        };
        if s > 0 && role.as_deref() == Some(m.role.as_str()) {
            s += SCORE_ROLE;
        }
        best = best.max(s);
    }
    if best == 0 { 0 } else { base + best }
}

/// Action index of the step most likely to have failed.
pub fn locate_step(recording: &Recording, failure: &str, mentions: &[Mention]) -> Option<usize> {
    if let Some(index) = marked_step(recording, failure) {
        debug!(step = index, "Failing step from explicit marker");
        return Some(index);
    }
    let mut best: Option<(usize, i32)> = None;
    for (index, step) in recording.action_steps().into_iter().enumerate() {
        if !step.kind().targets_element() {
            continue;
        }
        let score = score_step(step, mentions);
        if score > 0 && best.map_or(true, |(_, b)| score > b) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

/// Best-guess locator for action step `index` from the snapshot's own
/// mentions.
pub fn synthesize_locator(recording: &Recording, index: usize, mentions: &[Mention]) -> Option<Descriptor> {
    let step = recording.action_step(index)?;
    let kind = step.kind();
    let (recorded_role, recorded_name) = match step.aria_target() {
        Some((role, name)) => (role, Some(name)),
        None => (None, None),
    };

    let exact = recorded_name
        .as_deref()
        .and_then(|name| mentions.iter().find(|m| m.name == name));
    let partial = || {
        let name = recorded_name.as_deref()?;
        mentions
            .iter()
            .filter(|m| names_match_partially(&m.name, name))
            .max_by_key(|m| recorded_role.as_deref() == Some(m.role.as_str()))
    };
    let same_role = || {
        let role = recorded_role.as_deref()?;
        mentions.iter().find(|m| m.role == role)
    };
    let by_step_kind = || {
        let roles = if kind == StepKind::Change { INPUT_ROLES } else { CLICKABLE_ROLES };
        mentions.iter().find(|m| roles.contains(&m.role.as_str()))
    };

    let (mention, is_exact) = match exact {
        Some(m) => (m, true),
        None => (partial().or_else(same_role).or_else(by_step_kind)?, false),
    };

    if kind == StepKind::Change && INPUT_ROLES.contains(&mention.role.as_str()) {
        return Some(Descriptor::Label { text: mention.name.clone(), exact: is_exact });
    }
    Some(Descriptor::role(&mention.role, Some(&mention.name), is_exact))
}

/// Single override guessed from the failure snapshot, or nothing.
pub fn heuristic_overrides(recording: &Recording, failure: &str) -> Vec<OverrideEntry> {
    let mentions = extract_mentions(failure);
    let Some(index) = locate_step(recording, failure, &mentions) else {
        debug!(mentions = mentions.len(), "Heuristic could not locate the failing step");
        return Vec::new();
    };
    let (Some(step), Some(locator)) = (recording.action_step(index), synthesize_locator(recording, index, &mentions))
    else {
        debug!(step = index, "Heuristic found no usable role or label mention");
        return Vec::new();
    };
    vec![OverrideEntry {
        step: index,
        action: step.step_type.clone(),
        locator,
        note: Some("heuristic guess from failure snapshot".to_string()),
    }]
}
