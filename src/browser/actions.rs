use std::time::Duration;
use crate::errors::PilotError;
use super::locator::{self, Descriptor, ResolvedLocator};
use super::page::PageDriver;

/// A page-mutating operation with its target already validated.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Click(Descriptor),
    Fill(Descriptor, String),
    Press(Option<Descriptor>, String),
    Select(Descriptor, String),
    Check(Descriptor, bool),
    Wait(u64),
    Navigate(String),
}

impl BrowserAction {
    /// Click and navigation may start a page load worth waiting for.
    pub fn may_navigate(&self) -> bool {
        matches!(self, Self::Click(_) | Self::Navigate(_))
    }
}

/// Timeouts applied to a single browser operation.
#[derive(Debug, Clone, Copy)]
pub struct ActionTimeouts {
    pub action: Duration,
    pub navigation: Duration,
}

/// Run one action against the page and return a short outcome note.
///
/// Element targets are checked for existence first, so a missing element
/// surfaces as [`PilotError::ElementNotFound`] instead of waiting out the
/// backend's full action timeout.
pub async fn execute_browser_action(
    page: &dyn PageDriver,
    action: &BrowserAction,
    timeouts: ActionTimeouts,
) -> Result<String, PilotError> {
    match action {
        BrowserAction::Click(target) => {
            let loc = require(page, target).await?;
            page.click(&loc, timeouts.action).await?;
            Ok(format!("clicked {}", locator::describe(target)))
        }
        BrowserAction::Fill(target, text) => {
            let loc = require(page, target).await?;
            page.fill(&loc, text, timeouts.action).await?;
            Ok(format!("filled {} ({} chars)", locator::describe(target), text.chars().count()))
        }
        BrowserAction::Press(target, key) => {
            match target {
                Some(t) => {
                    let loc = require(page, t).await?;
                    page.press(Some(&loc), key, timeouts.action).await?;
                    Ok(format!("pressed {} on {}", key, locator::describe(t)))
                }
                None => {
                    page.press(None, key, timeouts.action).await?;
                    Ok(format!("pressed {}", key))
                }
            }
        }
        BrowserAction::Select(target, value) => {
            let loc = require(page, target).await?;
            page.select_option(&loc, value, timeouts.action).await?;
            Ok(format!("selected \"{}\" in {}", value, locator::describe(target)))
        }
        BrowserAction::Check(target, checked) => {
            let loc = require(page, target).await?;
            page.set_checked(&loc, *checked, timeouts.action).await?;
            let verb = if *checked { "checked" } else { "unchecked" };
            Ok(format!("{} {}", verb, locator::describe(target)))
        }
        BrowserAction::Wait(ms) => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(format!("waited {}ms", ms))
        }
        BrowserAction::Navigate(url) => {
            page.goto(url, timeouts.navigation).await?;
            Ok(format!("navigated to {}", url))
        }
    }
}

async fn require(page: &dyn PageDriver, target: &Descriptor) -> Result<ResolvedLocator, PilotError> {
    let resolved = locator::resolve(target);
    if !locator::exists(page, &resolved).await {
        return Err(PilotError::ElementNotFound(locator::describe(target)));
    }
    Ok(resolved)
}
