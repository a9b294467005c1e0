pub mod commands;
pub mod generate;
pub mod models;
pub mod review;
pub mod run;
pub mod validate;

use std::path::Path;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use crate::config::{self, AppConfig};
use crate::errors::PilotError;
use tracing::warn;

pub use commands::{Cli, Commands};
use commands::LlmArgs;

/// Load the configuration and apply command-line LLM overrides, which take
/// precedence over the file and the environment.
pub async fn load_app_config(path: Option<&Path>, llm: &LlmArgs) -> Result<AppConfig, PilotError> {
    let mut config = config::load_config(path).await?;
    if let Some(provider) = &llm.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &llm.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(base_url) = &llm.base_url {
        config.llm.base_url = Some(base_url.clone());
    }
    Ok(config)
}

pub fn log_config_warnings(config: &AppConfig) {
    for warning in config.warnings() {
        warn!(%warning, "Configuration warning");
    }
}

/// Spinner for long waits; hidden when `quiet`.
pub fn spinner(quiet: bool, message: impl Into<String>) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("  {spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
