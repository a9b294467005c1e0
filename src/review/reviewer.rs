use std::path::PathBuf;
use std::sync::Arc;
use serde::Serialize;
use crate::config::AppConfig;
use crate::errors::PilotError;
use crate::llm::{ChatOptions, LLMProvider};
use crate::recording::generator::parse_recording;
use crate::recording::scorer::best_selector;
use crate::recording::sidecars::{
    load_overrides, merge_overrides, save_overrides, sidecar_paths, validate_overrides, OverrideEntry,
};
use crate::recording::types::Recording;
use crate::utils::truncation::truncate_chars;
use super::heuristic::heuristic_overrides;
use super::response::parse_review_response;
use tracing::{info, warn};

const FAILURE_MAX_CHARS: usize = 12_000;

pub const REVIEWER_INSTRUCTIONS: &str = r##"You repair locators in a recorded browser test. A replay of the recording failed. You get the recorded steps, the overrides already in use, and a snapshot of the page at the time of failure.

Steps are numbered from 0. Setup steps (navigate, setViewport) are listed with "-" and cannot be overridden. Propose locator overrides for the steps that no longer match the page. Use only roles and names that appear in the failure snapshot.

Reply with one JSON object and nothing else:
{"overrides": [{"step": <step number from the listing>, "action": "<the step's recorded type>", "locator": LOCATOR, "note": "<short reason>"}]}

LOCATOR is one of:
{"kind":"role","role":"button","name":"Save","exact":true}
{"kind":"label","text":"Email"}
{"kind":"testid","value":"submit"}
{"kind":"text","text":"Continue"}
{"kind":"css","selector":"#save"}

"action" must equal the recorded type of that step. Return {"overrides": []} if nothing should change."##;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub recording: PathBuf,
    pub failure: PathBuf,
    /// Defaults to the recording's `<stem>.overrides.json`.
    pub overrides: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub source: ReviewSource,
    pub proposed: Vec<OverrideEntry>,
    pub merged: Vec<OverrideEntry>,
    pub written: Option<PathBuf>,
}

/// Compact listing of the recording for the prompt: one line per step with
/// its action number, type, chosen selector and value.
pub fn step_digest(recording: &Recording) -> String {
    let mut out = String::new();
    for (number, step) in recording.numbered_steps() {
        match number {
            Some(n) => out.push_str(&format!("{}: {}", n, step.step_type)),
            None => out.push_str(&format!("-: {}", step.step_type)),
        }
        if step.kind().targets_element() {
            let best = best_selector(&step.selector_groups());
            out.push_str(&format!(" selector={}", best.raw));
            if let Some((role, name)) = step.aria_target() {
                out.push_str(&format!(" aria={}{:?}", role.map(|r| format!("{} ", r)).unwrap_or_default(), name));
            }
        }
        if let Some(url) = &step.url {
            out.push_str(&format!(" url={}", url));
        }
        if let Some(key) = &step.key {
            out.push_str(&format!(" key={}", key));
        }
        out.push('\n');
    }
    out
}

pub fn build_review_prompt(recording: &Recording, existing: &[OverrideEntry], failure: &str) -> String {
    let existing_json = serde_json::to_string_pretty(existing).unwrap_or_else(|_| "[]".to_string());
    format!(
        "## Recording: {}\n{}\n## Existing overrides\n{}\n\n## Failure snapshot\n{}\n",
        recording.title,
        step_digest(recording),
        existing_json,
        truncate_chars(failure, FAILURE_MAX_CHARS),
    )
}

/// Proposes locator overrides for a failing replay.
pub struct OverrideReviewer {
    llm: Arc<dyn LLMProvider>,
    chat: ChatOptions,
}

impl OverrideReviewer {
    pub fn new(llm: Arc<dyn LLMProvider>, config: &AppConfig) -> Self {
        let chat = ChatOptions {
            temperature: config.llm.temperature,
            top_p: config.llm.top_p,
            json: true,
        };
        Self { llm, chat }
    }

    async fn ask_model(
        &self,
        recording: &Recording,
        existing: &[OverrideEntry],
        failure: &str,
    ) -> Result<Vec<OverrideEntry>, PilotError> {
        let prompt = build_review_prompt(recording, existing, failure);
        let response = self.llm.complete(&prompt, Some(REVIEWER_INSTRUCTIONS), &self.chat).await?;
        parse_review_response(&response.content, recording)
    }

    /// Ask the model; on any failure or an empty answer, fall back to the
    /// heuristic. Errors only when neither produces an override.
    pub async fn propose(
        &self,
        recording: &Recording,
        existing: &[OverrideEntry],
        failure: &str,
    ) -> Result<(Vec<OverrideEntry>, ReviewSource), PilotError> {
        let model_problem = match self.ask_model(recording, existing, failure).await {
            Ok(entries) if !entries.is_empty() => {
                info!(count = entries.len(), model = %self.llm.model_name(), "Model proposed overrides");
                return Ok((entries, ReviewSource::Model));
            }
            Ok(_) => "model proposed no overrides".to_string(),
            Err(e) => e.to_string(),
        };
        warn!(reason = %model_problem, "Falling back to heuristic review");

        let entries = heuristic_overrides(recording, failure);
        if entries.is_empty() {
            return Err(PilotError::Review(format!(
                "no override could be proposed ({}; the failure snapshot names no matching role or step)",
                model_problem
            )));
        }
        Ok((entries, ReviewSource::Heuristic))
    }

    /// Full review: load inputs, propose, merge with the existing sidecar,
    /// re-validate and persist unless `dry_run`.
    pub async fn review(&self, request: &ReviewRequest) -> Result<ReviewOutcome, PilotError> {
        let content = tokio::fs::read_to_string(&request.recording).await?;
        let recording = parse_recording(&content)?;
        let failure = tokio::fs::read_to_string(&request.failure).await?;
        let overrides_path = request.overrides.clone().unwrap_or_else(|| sidecar_paths(&request.recording).0);
        let existing = load_overrides(&overrides_path).await?;

        let (proposed, source) = self.propose(&recording, &existing, &failure).await?;
        let merged = merge_overrides(&existing, &proposed);
        validate_overrides(&recording, &merged)?;

        let written = if request.dry_run {
            None
        } else {
            save_overrides(&overrides_path, &merged).await?;
            info!(path = %overrides_path.display(), count = merged.len(), "Overrides written");
            Some(overrides_path)
        };
        Ok(ReviewOutcome { source, proposed, merged, written })
    }
}
