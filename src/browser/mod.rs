pub mod actions;
pub mod locator;
pub mod page;
pub mod playwright;

pub use actions::{execute_browser_action, ActionTimeouts, BrowserAction};
pub use locator::{Descriptor, ResolvedLocator};
pub use page::{LoadState, PageDriver};
pub use playwright::PlaywrightPage;
