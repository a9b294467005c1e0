use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::stream::{self, StreamExt};
use crate::agent::result::StepResult;
use crate::agent::runner::{AgentRunner, StepSpec};
use crate::agent::Action;
use crate::browser::page::PageDriver;
use crate::browser::playwright::PlaywrightPage;
use crate::config::AppConfig;
use crate::errors::PilotError;
use crate::llm::LLMProvider;
use crate::models::CaseResult;
use super::testcase::LoadedCase;
use super::variables::{interpolate, mask, redact};
use tracing::{error, info, warn};

/// Runs test cases, each in its own browser, steps strictly in order.
pub struct SuiteRunner {
    agent: AgentRunner,
    config: Arc<AppConfig>,
    run_dir: PathBuf,
}

impl SuiteRunner {
    pub fn new(llm: Arc<dyn LLMProvider>, config: Arc<AppConfig>, run_dir: PathBuf) -> Self {
        Self {
            agent: AgentRunner::new(llm, Arc::clone(&config)),
            config,
            run_dir,
        }
    }

    /// Run every case. Sequential unless `runner.parallel`, in which case up
    /// to `runner.workers` cases run at once. Results keep input order.
    pub async fn run_all(&self, cases: &[LoadedCase]) -> Vec<CaseResult> {
        if !self.config.runner.parallel || self.config.runner.workers <= 1 {
            let mut results = Vec::with_capacity(cases.len());
            for case in cases {
                results.push(self.run_case(case).await);
            }
            return results;
        }

        let workers = self.config.runner.workers;
        info!(workers, cases = cases.len(), "Running test cases in parallel");
        let mut indexed: Vec<(usize, CaseResult)> = stream::iter(cases.iter().enumerate())
            .map(|(i, case)| async move { (i, self.run_case(case).await) })
            .buffer_unordered(workers)
            .collect()
            .await;
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, r)| r).collect()
    }

    /// Launch a browser for the case, run it, and close the browser.
    pub async fn run_case(&self, loaded: &LoadedCase) -> CaseResult {
        let started = Instant::now();
        let page = match PlaywrightPage::launch(&self.config.browser).await {
            Ok(page) => page,
            Err(e) => {
                error!(case = %loaded.case.id, error = %e, "Browser launch failed");
                return self.aborted(loaded, e, started);
            }
        };
        let result = self.run_case_on(&page, loaded).await;
        if let Err(e) = page.close().await {
            warn!(case = %loaded.case.id, error = %e, "Browser did not close cleanly");
        }
        result
    }

    /// Run a case against an already-open page.
    pub async fn run_case_on(&self, page: &dyn PageDriver, loaded: &LoadedCase) -> CaseResult {
        let started = Instant::now();
        let case = &loaded.case;
        let env = |name: &str| std::env::var(name).ok();
        info!(case = %case.id, name = %case.name, steps = case.steps.len(), "Running test case");

        let viewport = self.config.browser.viewport;
        if let Err(e) = page.set_viewport(viewport.width, viewport.height).await {
            warn!(case = %case.id, error = %e, "Could not set viewport");
        }

        let base_url = interpolate(&case.base_url, &case.variables, env);
        let navigation = Duration::from_millis(self.config.browser.navigation_timeout_ms);
        if let Err(e) = page.goto(&base_url.text, navigation).await {
            error!(case = %case.id, error = %e, "Could not open base URL");
            return self.aborted(loaded, e, started);
        }

        let mut steps = Vec::with_capacity(case.steps.len());
        let mut skipped = Vec::new();
        let mut failed = false;

        for (index, step) in case.steps.iter().enumerate() {
            if failed {
                skipped.push(mask(&step.goal, &[]));
                continue;
            }

            let goal = interpolate(&step.goal, &case.variables, env);
            let mut secrets = goal.values.clone();
            let mut expectations = step.expect.clone();
            for expectation in &mut expectations {
                let resolved = interpolate(&expectation.value, &case.variables, env);
                secrets.extend(resolved.values);
                expectation.value = resolved.text;
            }

            let spec = StepSpec {
                index,
                goal: goal.text.clone(),
                display_goal: mask(&step.goal, &secrets),
                expectations,
                max_ticks: step.max_ticks,
            };
            let mut result = self.agent.run_step(page, &spec).await;
            redact_step(&mut result, &secrets);

            if !result.success {
                failed = true;
                if let Err(e) = self.write_failure_context(&case.id, &result).await {
                    warn!(case = %case.id, error = %e, "Could not write failure context");
                }
            }
            steps.push(result);
        }

        let success = !failed;
        info!(case = %case.id, success, skipped = skipped.len(), "Test case finished");
        CaseResult {
            id: case.id.clone(),
            name: case.name.clone(),
            source: loaded.path.display().to_string(),
            success,
            steps,
            skipped_steps: skipped,
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn aborted(&self, loaded: &LoadedCase, error: PilotError, started: Instant) -> CaseResult {
        CaseResult {
            id: loaded.case.id.clone(),
            name: loaded.case.name.clone(),
            source: loaded.path.display().to_string(),
            success: false,
            steps: Vec::new(),
            skipped_steps: loaded.case.steps.iter().map(|s| mask(&s.goal, &[])).collect(),
            error: Some(error.to_string()),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Write the last observation of a failed step as plain text. The file
    /// doubles as the failure snapshot input for `webpilot review`.
    async fn write_failure_context(&self, case_id: &str, result: &StepResult) -> Result<PathBuf, PilotError> {
        let dir = self.run_dir.join(sanitize(case_id));
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("step-{}-failure.txt", result.index));
        tokio::fs::write(&path, failure_context(result)).await?;
        info!(path = %path.display(), "Failure context written");
        Ok(path)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

/// Human- and reviewer-readable failure snapshot of a step.
pub fn failure_context(result: &StepResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Test step {}: {}\n", result.index, result.goal));
    out.push_str(&format!("Error: {}\n", result.error.as_deref().unwrap_or("unknown")));
    if let Some(debug) = &result.debug {
        if let Some(obs) = &debug.observation {
            out.push_str(&format!("URL: {}\nTitle: {}\n", obs.url, obs.title));
        }
        if let Some(last) = &debug.last_error {
            out.push_str(&format!("Last error: {}\n", last));
        }
        if let Some(raw) = &debug.raw_response {
            out.push_str(&format!("Last model response: {}\n", raw));
        }
        if let Some(obs) = &debug.observation {
            out.push_str("\nAccessibility tree:\n");
            out.push_str(&obs.ax_tree);
            out.push('\n');
        }
    }
    out.push_str("\nActions:\n");
    for record in &result.actions {
        out.push_str("- ");
        out.push_str(&record.summary());
        out.push('\n');
    }
    out
}

/// Remove resolved variable values from everything a step result persists.
fn redact_step(result: &mut StepResult, secrets: &[String]) {
    if secrets.is_empty() {
        return;
    }
    for record in &mut result.actions {
        record.detail = redact(&record.detail, secrets);
        if let Some(Action::Fill { text, .. }) = &mut record.action {
            *text = redact(text, secrets);
        }
    }
    for expectation in &mut result.expectations {
        expectation.expectation.value = redact(&expectation.expectation.value, secrets);
        if let Some(detail) = &mut expectation.detail {
            *detail = redact(detail, secrets);
        }
    }
    if let Some(error) = &mut result.error {
        *error = redact(error, secrets);
    }
    if let Some(debug) = &mut result.debug {
        if let Some(raw) = &mut debug.raw_response {
            *raw = redact(raw, secrets);
        }
        if let Some(last) = &mut debug.last_error {
            *last = redact(last, secrets);
        }
        if let Some(obs) = &mut debug.observation {
            obs.url = redact(&obs.url, secrets);
            obs.title = redact(&obs.title, secrets);
            obs.ax_tree = redact(&obs.ax_tree, secrets);
            obs.visible_text = redact(&obs.visible_text, secrets);
            if let Some(last) = &mut obs.last_error {
                *last = redact(last, secrets);
            }
            for record in &mut obs.history {
                record.detail = redact(&record.detail, secrets);
                if let Some(Action::Fill { text, .. }) = &mut record.action {
                    *text = redact(text, secrets);
                }
            }
        }
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
