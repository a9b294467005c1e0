//! Element descriptors and their mapping to concrete page lookups.
//!
//! A [`Descriptor`] says *what* element is wanted (by role, label, text, ...).
//! [`resolve`] turns it into a [`ResolvedLocator`], the find operation a
//! [`PageDriver`] executes. [`Descriptor::to_code`] renders the same
//! descriptor as a Playwright Test locator expression for generated scripts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::errors::PilotError;
use super::page::PageDriver;
use tracing::debug;

/// Attribute looked up by `testid` descriptors.
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

/// Element used when a focus lookup finds nothing focused.
pub const FOCUS_FALLBACK: &str = "body";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Descriptor {
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },
    Label {
        #[serde(alias = "label")]
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },
    #[serde(rename = "testid")]
    TestId {
        #[serde(alias = "testid", alias = "testId")]
        value: String,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },
    Css {
        selector: String,
    },
    Active,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Descriptor {
    pub fn role(role: &str, name: Option<&str>, exact: bool) -> Self {
        Self::Role { role: role.to_string(), name: name.map(str::to_string), exact }
    }

    pub fn css(selector: &str) -> Self {
        Self::Css { selector: selector.to_string() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role { .. } => "role",
            Self::Label { .. } => "label",
            Self::TestId { .. } => "testid",
            Self::Text { .. } => "text",
            Self::Css { .. } => "css",
            Self::Active => "active",
        }
    }

    /// Reject descriptors whose discriminating field is blank.
    pub fn validate(&self) -> Result<(), PilotError> {
        let (field, value) = match self {
            Self::Role { role, .. } => ("role", role.as_str()),
            Self::Label { text, .. } => ("text", text.as_str()),
            Self::TestId { value } => ("value", value.as_str()),
            Self::Text { text, .. } => ("text", text.as_str()),
            Self::Css { selector } => ("selector", selector.as_str()),
            Self::Active => return Ok(()),
        };
        if value.trim().is_empty() {
            return Err(PilotError::Locator(format!("{} locator has an empty '{}'", self.kind(), field)));
        }
        Ok(())
    }

    /// Render as a Playwright Test locator expression on `page`.
    pub fn to_code(&self) -> String {
        match self {
            Self::Role { role, name, exact } => match name {
                Some(name) if *exact => format!(
                    "page.getByRole({}, {{ name: {}, exact: true }})",
                    js_str(role),
                    js_str(name)
                ),
                Some(name) => format!("page.getByRole({}, {{ name: {} }})", js_str(role), js_str(name)),
                None => format!("page.getByRole({})", js_str(role)),
            },
            Self::Label { text, exact } => with_exact("getByLabel", text, *exact),
            Self::TestId { value } => format!("page.getByTestId({})", js_str(value)),
            Self::Text { text, exact } => with_exact("getByText", text, *exact),
            Self::Css { selector } => format!("page.locator({})", js_str(selector)),
            Self::Active => "page.locator(':focus')".to_string(),
        }
    }
}

fn with_exact(method: &str, text: &str, exact: bool) -> String {
    if exact {
        format!("page.{}({}, {{ exact: true }})", method, js_str(text))
    } else {
        format!("page.{}({})", method, js_str(text))
    }
}

/// Quote a string as a JavaScript string literal.
pub fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// The concrete find operation sent to the page backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ResolvedLocator {
    Role { role: String, name: Option<String>, exact: bool },
    Label { text: String, exact: bool },
    #[serde(rename = "testid")]
    TestId { attribute: String, value: String },
    Text { text: String, exact: bool },
    Css { selector: String },
    Focused { fallback: String },
}

pub fn resolve(descriptor: &Descriptor) -> ResolvedLocator {
    match descriptor {
        Descriptor::Role { role, name, exact } => ResolvedLocator::Role {
            role: role.clone(),
            name: name.clone(),
            exact: *exact,
        },
        Descriptor::Label { text, exact } => ResolvedLocator::Label { text: text.clone(), exact: *exact },
        Descriptor::TestId { value } => ResolvedLocator::TestId {
            attribute: TEST_ID_ATTRIBUTE.to_string(),
            value: value.clone(),
        },
        Descriptor::Text { text, exact } => ResolvedLocator::Text { text: text.clone(), exact: *exact },
        Descriptor::Css { selector } => ResolvedLocator::Css { selector: selector.clone() },
        Descriptor::Active => ResolvedLocator::Focused { fallback: FOCUS_FALLBACK.to_string() },
    }
}

/// Parse and resolve a raw JSON descriptor. Unknown or missing `kind` values
/// are an error, never a default.
pub fn resolve_value(raw: &Value) -> Result<ResolvedLocator, PilotError> {
    let kind = raw.get("kind").and_then(Value::as_str)
        .ok_or_else(|| PilotError::Locator(format!("locator is missing 'kind': {}", raw)))?;
    let descriptor: Descriptor = serde_json::from_value(raw.clone())
        .map_err(|e| PilotError::Locator(format!("invalid '{}' locator: {}", kind, e)))?;
    descriptor.validate()?;
    Ok(resolve(&descriptor))
}

/// True when the locator matches at least one element. Backend failures
/// count as "does not exist".
pub async fn exists(page: &dyn PageDriver, locator: &ResolvedLocator) -> bool {
    match page.count(locator).await {
        Ok(n) => n > 0,
        Err(e) => {
            debug!(error = %e, "Locator count failed");
            false
        }
    }
}

/// Short human-readable form for logs and action history.
pub fn describe(descriptor: &Descriptor) -> String {
    match descriptor {
        Descriptor::Role { role, name: Some(name), exact: true } => format!("{} \"{}\" (exact)", role, name),
        Descriptor::Role { role, name: Some(name), .. } => format!("{} \"{}\"", role, name),
        Descriptor::Role { role, name: None, .. } => role.clone(),
        Descriptor::Label { text, .. } => format!("field labelled \"{}\"", text),
        Descriptor::TestId { value } => format!("[{}=\"{}\"]", TEST_ID_ATTRIBUTE, value),
        Descriptor::Text { text, .. } => format!("text \"{}\"", text),
        Descriptor::Css { selector } => format!("css `{}`", selector),
        Descriptor::Active => "focused element".to_string(),
    }
}
