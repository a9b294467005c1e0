use serde::{Deserialize, Serialize};
use crate::browser::actions::BrowserAction;
use crate::browser::locator::{self, Descriptor};
use crate::errors::PilotError;
use super::expectations::Expectation;

/// One discrete UI action chosen by the model for a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Click {
        locator: Descriptor,
    },
    Fill {
        locator: Descriptor,
        text: String,
    },
    Press {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locator: Option<Descriptor>,
    },
    Select {
        locator: Descriptor,
        value: String,
    },
    Check {
        locator: Descriptor,
        #[serde(default = "default_checked")]
        checked: bool,
    },
    Wait {
        ms: u64,
    },
    Goto {
        url: String,
    },
    Assert {
        expect: Expectation,
    },
    Fail {
        reason: String,
    },
}

fn default_checked() -> bool {
    true
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::Fill { .. } => "fill",
            Self::Press { .. } => "press",
            Self::Select { .. } => "select",
            Self::Check { .. } => "check",
            Self::Wait { .. } => "wait",
            Self::Goto { .. } => "goto",
            Self::Assert { .. } => "assert",
            Self::Fail { .. } => "fail",
        }
    }

    /// Boundary validation for model output. Required strings must be
    /// non-empty and locators well-formed; `wait` is clamped to `max_wait_ms`.
    pub fn validated(self, max_wait_ms: u64) -> Result<Self, PilotError> {
        fn non_empty(action: &str, field: &str, value: &str) -> Result<(), PilotError> {
            if value.trim().is_empty() {
                return Err(PilotError::OutputValidation(format!("'{}' requires a non-empty '{}'", action, field)));
            }
            Ok(())
        }

        let invalid_locator = |e: PilotError| PilotError::OutputValidation(e.to_string());
        match &self {
            Self::Click { locator } => locator.validate().map_err(invalid_locator)?,
            Self::Fill { locator, .. } => locator.validate().map_err(invalid_locator)?,
            Self::Press { key, locator } => {
                non_empty("press", "key", key)?;
                if let Some(loc) = locator {
                    loc.validate().map_err(invalid_locator)?;
                }
            }
            Self::Select { locator, value } => {
                locator.validate().map_err(invalid_locator)?;
                non_empty("select", "value", value)?;
            }
            Self::Check { locator, .. } => locator.validate().map_err(invalid_locator)?,
            Self::Wait { ms } => {
                if *ms > max_wait_ms {
                    return Ok(Self::Wait { ms: max_wait_ms });
                }
            }
            Self::Goto { url } => non_empty("goto", "url", url)?,
            Self::Assert { expect } => expect.validate()?,
            Self::Fail { .. } => {}
        }
        Ok(self)
    }

    /// The page mutation this action performs, if any. `goto` URLs are
    /// resolved against `current_url` so relative paths work.
    pub fn to_browser_action(&self, current_url: &str) -> Option<BrowserAction> {
        let action = match self {
            Self::Click { locator } => BrowserAction::Click(locator.clone()),
            Self::Fill { locator, text } => BrowserAction::Fill(locator.clone(), text.clone()),
            Self::Press { key, locator } => BrowserAction::Press(locator.clone(), key.clone()),
            Self::Select { locator, value } => BrowserAction::Select(locator.clone(), value.clone()),
            Self::Check { locator, checked } => BrowserAction::Check(locator.clone(), *checked),
            Self::Wait { ms } => BrowserAction::Wait(*ms),
            Self::Goto { url } => BrowserAction::Navigate(resolve_url(current_url, url)),
            Self::Assert { .. } | Self::Fail { .. } => return None,
        };
        Some(action)
    }

    /// One-line form for history and logs. Typed text is not echoed.
    pub fn summary(&self) -> String {
        match self {
            Self::Click { locator } => format!("click {}", locator::describe(locator)),
            Self::Fill { locator, text } => {
                format!("fill {} with {} chars", locator::describe(locator), text.chars().count())
            }
            Self::Press { key, locator: Some(loc) } => format!("press {} on {}", key, locator::describe(loc)),
            Self::Press { key, locator: None } => format!("press {}", key),
            Self::Select { locator, value } => format!("select \"{}\" in {}", value, locator::describe(locator)),
            Self::Check { locator, checked } => {
                format!("{} {}", if *checked { "check" } else { "uncheck" }, locator::describe(locator))
            }
            Self::Wait { ms } => format!("wait {}ms", ms),
            Self::Goto { url } => format!("goto {}", url),
            Self::Assert { expect } => format!("assert {}", expect.describe()),
            Self::Fail { reason } => format!("fail: {}", reason),
        }
    }
}

fn resolve_url(current: &str, target: &str) -> String {
    if url::Url::parse(target).is_ok() {
        return target.to_string();
    }
    match url::Url::parse(current).and_then(|base| base.join(target)) {
        Ok(joined) => joined.to_string(),
        Err(_) => target.to_string(),
    }
}
