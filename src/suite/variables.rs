//! `{{NAME}}` placeholder interpolation and masking.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use regex::{Captures, Regex};
use tracing::warn;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

/// Token that replaces placeholders and resolved values in logged text.
pub const MASK: &str = "[MASKED]";

/// Used instead of [`MASK`] when a secret is itself part of the mask token.
const ALTERNATE_MASKS: &[&str] = &["***", "###"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    pub text: String,
    /// Values substituted into `text`, for later redaction.
    pub values: Vec<String>,
    /// Placeholder names left verbatim.
    pub unresolved: Vec<String>,
}

/// Resolve placeholders from `variables`, then from `env`. Unknown names
/// are left as written and logged.
pub fn interpolate<F>(text: &str, variables: &BTreeMap<String, String>, env: F) -> Interpolated
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = Vec::new();
    let mut unresolved = Vec::new();
    let out = PLACEHOLDER.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match variables.get(name).cloned().or_else(|| env(name)) {
            Some(value) => {
                values.push(value.clone());
                value
            }
            None => {
                unresolved.push(name.to_string());
                caps[0].to_string()
            }
        }
    });
    for name in &unresolved {
        warn!(variable = %name, "Unresolved placeholder left verbatim");
    }
    Interpolated { text: out.into_owned(), values, unresolved }
}

/// Masked form of a template: every placeholder becomes the mask token and
/// any of `secrets` still present is redacted.
pub fn mask(template: &str, secrets: &[String]) -> String {
    let token = mask_token(secrets);
    let replaced = PLACEHOLDER.replace_all(template, token);
    redact_with(&replaced, secrets, token)
}

/// Redact every occurrence of each non-empty secret.
pub fn redact(text: &str, secrets: &[String]) -> String {
    redact_with(text, secrets, mask_token(secrets))
}

fn mask_token(secrets: &[String]) -> &'static str {
    std::iter::once(MASK)
        .chain(ALTERNATE_MASKS.iter().copied())
        .find(|token| !secrets.iter().any(|s| !s.is_empty() && token.contains(s.as_str())))
        .unwrap_or(MASK)
}

/// Replace the union of all secret occurrences, so overlapping secrets are
/// covered by a single token.
fn redact_with(text: &str, secrets: &[String], token: &str) -> String {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        ranges.extend(text.match_indices(secret.as_str()).map(|(i, m)| (i, i + m.len())));
    }
    if ranges.is_empty() {
        return text.to_string();
    }
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in merged {
        out.push_str(&text[cursor..start]);
        out.push_str(token);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
