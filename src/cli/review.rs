use std::path::Path;
use std::sync::Arc;
use console::style;
use crate::cli::commands::ReviewArgs;
use crate::errors::PilotError;
use crate::llm::{create_provider, LLMProvider};
use crate::browser::locator::describe;
use crate::review::{OverrideReviewer, ReviewOutcome, ReviewRequest, ReviewSource};
use super::{load_app_config, log_config_warnings, spinner};

pub async fn handle_review(args: ReviewArgs, config_path: Option<&Path>, quiet: bool) -> Result<(), PilotError> {
    let config = load_app_config(config_path, &args.llm).await?;
    log_config_warnings(&config);

    let llm: Arc<dyn LLMProvider> = Arc::from(create_provider(&config.llm)?);
    let reviewer = OverrideReviewer::new(llm, &config);
    let request = ReviewRequest {
        recording: args.recording.clone(),
        failure: args.failure.clone(),
        overrides: args.overrides.clone(),
        dry_run: args.dry_run,
    };

    let bar = spinner(quiet, "Reviewing failure");
    let outcome = reviewer.review(&request).await;
    bar.finish_and_clear();
    let outcome = outcome?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "overrides": outcome.merged }))?);
    } else if !quiet {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &ReviewOutcome) {
    let source = match outcome.source {
        ReviewSource::Model => style("model").green(),
        ReviewSource::Heuristic => style("heuristic fallback").yellow(),
    };
    println!("  {} override(s) proposed by {}", outcome.proposed.len(), source);
    for entry in &outcome.proposed {
        println!("    step {} ({}): {}", entry.step, entry.action, describe(&entry.locator));
    }
    if let Some(path) = &outcome.written {
        println!("  {} {} ({} total)", style("wrote").green(), path.display(), outcome.merged.len());
    }
}
