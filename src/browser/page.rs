use std::time::Duration;
use async_trait::async_trait;
use crate::errors::PilotError;
use super::locator::ResolvedLocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

/// The live page a test step drives. One implementation per automation
/// backend; the agent loop and expectation evaluator only see this trait.
///
/// Read operations never mutate the page. Every mutation takes a timeout
/// and fails with [`PilotError::Timeout`] or [`PilotError::Browser`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn url(&self) -> Result<String, PilotError>;

    async fn title(&self) -> Result<String, PilotError>;

    /// Structural accessibility snapshot of the document, as text.
    async fn aria_snapshot(&self) -> Result<String, PilotError>;

    /// `document.body.innerText`
    async fn inner_text(&self) -> Result<String, PilotError>;

    async fn count(&self, locator: &ResolvedLocator) -> Result<usize, PilotError>;

    /// Wait up to `timeout` for the first match to become visible.
    async fn is_visible(&self, locator: &ResolvedLocator, timeout: Duration) -> Result<bool, PilotError>;

    async fn click(&self, locator: &ResolvedLocator, timeout: Duration) -> Result<(), PilotError>;

    async fn fill(&self, locator: &ResolvedLocator, text: &str, timeout: Duration) -> Result<(), PilotError>;

    /// Press a key on the element, or on the keyboard when `locator` is `None`.
    async fn press(&self, locator: Option<&ResolvedLocator>, key: &str, timeout: Duration) -> Result<(), PilotError>;

    async fn select_option(&self, locator: &ResolvedLocator, value: &str, timeout: Duration) -> Result<(), PilotError>;

    async fn set_checked(&self, locator: &ResolvedLocator, checked: bool, timeout: Duration) -> Result<(), PilotError>;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), PilotError>;

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> Result<(), PilotError>;

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), PilotError>;

    async fn close(&self) -> Result<(), PilotError>;
}
