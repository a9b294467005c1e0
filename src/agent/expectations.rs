use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::browser::locator::{self, Descriptor, ResolvedLocator};
use crate::browser::page::PageDriver;
use crate::errors::PilotError;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationKind {
    UrlContains,
    VisibleText,
    LocatorVisible,
}

impl ExpectationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrlContains => "url_contains",
            Self::VisibleText => "visible_text",
            Self::LocatorVisible => "locator_visible",
        }
    }
}

/// A post-condition a step must reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(rename = "type")]
    pub kind: ExpectationKind,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Descriptor>,
}

impl Expectation {
    pub fn url_contains(value: &str) -> Self {
        Self { kind: ExpectationKind::UrlContains, value: value.to_string(), locator: None }
    }

    pub fn visible_text(value: &str) -> Self {
        Self { kind: ExpectationKind::VisibleText, value: value.to_string(), locator: None }
    }

    pub fn locator_visible(locator: Descriptor) -> Self {
        Self { kind: ExpectationKind::LocatorVisible, value: String::new(), locator: Some(locator) }
    }

    pub fn validate(&self) -> Result<(), PilotError> {
        match (&self.kind, &self.locator) {
            (ExpectationKind::LocatorVisible, Some(loc)) => loc.validate(),
            _ if self.value.trim().is_empty() => Err(PilotError::OutputValidation(format!(
                "{} expectation needs a non-empty value",
                self.kind.as_str()
            ))),
            _ => Ok(()),
        }
    }

    pub fn describe(&self) -> String {
        match &self.locator {
            Some(loc) if self.kind == ExpectationKind::LocatorVisible => {
                format!("locator_visible {}", locator::describe(loc))
            }
            _ => format!("{} \"{}\"", self.kind.as_str(), self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationResult {
    pub expectation: Expectation,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Check one expectation against the current page. Never fails: backend
/// errors become a failed result carrying the message.
pub async fn evaluate(page: &dyn PageDriver, expectation: &Expectation, timeout: Duration) -> ExpectationResult {
    let outcome = check(page, expectation, timeout).await;
    let (passed, detail) = match outcome {
        Ok((passed, detail)) => (passed, detail),
        Err(e) => (false, Some(e.to_string())),
    };
    debug!(expectation = %expectation.describe(), passed, "Expectation evaluated");
    ExpectationResult { expectation: expectation.clone(), passed, detail }
}

async fn check(
    page: &dyn PageDriver,
    expectation: &Expectation,
    timeout: Duration,
) -> Result<(bool, Option<String>), PilotError> {
    match expectation.kind {
        ExpectationKind::UrlContains => {
            let url = page.url().await?;
            let passed = url.contains(&expectation.value);
            let detail = (!passed).then(|| format!("current URL is {}", url));
            Ok((passed, detail))
        }
        ExpectationKind::VisibleText => {
            let loc = text_locator(&expectation.value);
            let passed = page.is_visible(&loc, timeout).await?;
            Ok((passed, (!passed).then(|| "text not visible".to_string())))
        }
        ExpectationKind::LocatorVisible => {
            let loc = match &expectation.locator {
                Some(descriptor) => {
                    descriptor.validate()?;
                    locator::resolve(descriptor)
                }
                None => text_locator(&expectation.value),
            };
            let passed = page.is_visible(&loc, timeout).await?;
            Ok((passed, (!passed).then(|| "element not visible".to_string())))
        }
    }
}

fn text_locator(text: &str) -> ResolvedLocator {
    locator::resolve(&Descriptor::Text { text: text.to_string(), exact: false })
}

/// Evaluate every expectation, without stopping at the first failure.
/// Returns whether all passed, plus the individual results in order.
pub async fn evaluate_all(
    page: &dyn PageDriver,
    expectations: &[Expectation],
    timeout: Duration,
) -> (bool, Vec<ExpectationResult>) {
    let mut results = Vec::with_capacity(expectations.len());
    for expectation in expectations {
        results.push(evaluate(page, expectation, timeout).await);
    }
    let all_passed = results.iter().all(|r| r.passed);
    (all_passed, results)
}
