use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::browser::actions::{execute_browser_action, ActionTimeouts};
use crate::browser::page::{LoadState, PageDriver};
use crate::config::AppConfig;
use crate::errors::PilotError;
use crate::llm::{ChatOptions, LLMProvider, Message};
use crate::utils::truncation::truncate_error;
use super::action::Action;
use super::expectations::{evaluate, evaluate_all, Expectation, ExpectationResult};
use super::observation::{extract_keywords, Observation, ObservationCollector};
use super::parser::parse_action;
use super::prompt::{build_tick_prompt, SYSTEM_INSTRUCTION};
use super::result::{ActionOutcome, ActionRecord, DebugBundle, StepResult};
use tracing::{debug, info, warn};

/// Extra time allowed over the provider's own HTTP timeout.
const MODEL_CALL_GRACE: Duration = Duration::from_secs(5);

/// One test step handed to the agent.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub index: usize,
    /// Goal with variables resolved; sent to the model.
    pub goal: String,
    /// Goal with variables masked; used for logs and results.
    pub display_goal: String,
    pub expectations: Vec<Expectation>,
    /// Overrides `agent.max_ticks` for this step.
    pub max_ticks: Option<u32>,
}

impl StepSpec {
    pub fn new(index: usize, goal: &str, expectations: Vec<Expectation>) -> Self {
        Self {
            index,
            goal: goal.to_string(),
            display_goal: goal.to_string(),
            expectations,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TickPhase {
    Observe,
    ModelCall,
    Parse,
    FailTerminal,
    AssertCheck,
    Execute,
    PostDelay,
    ExpectationCheck,
}

/// Drives one page toward a goal, one model-chosen action per tick.
pub struct AgentRunner {
    llm: Arc<dyn LLMProvider>,
    config: Arc<AppConfig>,
    collector: ObservationCollector,
    chat: ChatOptions,
}

/// Mutable bookkeeping for a single step.
struct StepState {
    history: Vec<ActionRecord>,
    expectation_results: Vec<ExpectationResult>,
    last_error: Option<String>,
    last_raw: Option<String>,
    last_observation: Option<Observation>,
}

impl StepState {
    fn record(&mut self, tick: u32, action: Option<Action>, outcome: ActionOutcome, detail: String) {
        self.history.push(ActionRecord { tick, action, outcome, detail });
    }

    fn debug_bundle(&self) -> DebugBundle {
        DebugBundle {
            observation: self.last_observation.clone(),
            raw_response: self.last_raw.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl AgentRunner {
    pub fn new(llm: Arc<dyn LLMProvider>, config: Arc<AppConfig>) -> Self {
        let collector = ObservationCollector::new(&config.agent);
        let chat = ChatOptions {
            temperature: config.llm.temperature,
            top_p: config.llm.top_p,
            json: true,
        };
        Self { llm, config, collector, chat }
    }

    fn trace(&self, tick: u32, phase: TickPhase) {
        debug!(tick, phase = ?phase, "Tick phase");
    }

    /// Run the tick loop for one step. Per-tick failures are recorded and
    /// absorbed; the result is always returned, never an error.
    pub async fn run_step(&self, page: &dyn PageDriver, step: &StepSpec) -> StepResult {
        let started = Instant::now();
        let agent = &self.config.agent;
        let max_ticks = step.max_ticks.unwrap_or(agent.max_ticks);
        let keywords = extract_keywords(&step.goal, &step.expectations);
        let expectation_timeout = Duration::from_millis(agent.expectation_timeout_ms);
        let timeouts = ActionTimeouts {
            action: Duration::from_millis(self.config.browser.action_timeout_ms),
            navigation: Duration::from_millis(self.config.browser.navigation_timeout_ms),
        };

        info!(step = step.index, goal = %step.display_goal, max_ticks, "Starting step");

        let mut state = StepState {
            history: Vec::new(),
            expectation_results: Vec::new(),
            last_error: None,
            last_raw: None,
            last_observation: None,
        };

        let finish = |state: StepState, success: bool, ticks_used: u32, error: Option<String>| {
            let debug = (!success).then(|| state.debug_bundle());
            StepResult {
                index: step.index,
                goal: step.display_goal.clone(),
                success,
                ticks_used,
                actions: state.history,
                expectations: state.expectation_results,
                error,
                debug,
                duration_ms: started.elapsed().as_millis() as u64,
            }
        };

        for tick in 1..=max_ticks {
            self.trace(tick, TickPhase::Observe);
            let observation = self.collector
                .collect(page, tick, &keywords, state.last_error.as_deref(), &state.history)
                .await;
            let prompt = build_tick_prompt(&step.goal, &step.expectations, max_ticks, &observation);
            let current_url = observation.url.clone();
            state.last_observation = Some(observation);

            self.trace(tick, TickPhase::ModelCall);
            let raw = match self.call_model(&prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    let msg = truncate_error(&e.to_string());
                    warn!(tick, error_type = e.classify().error_type, error = %msg, "Model call failed");
                    state.record(tick, None, ActionOutcome::ModelError, msg.clone());
                    state.last_error = Some(msg);
                    continue;
                }
            };
            state.last_raw = Some(raw.clone());

            self.trace(tick, TickPhase::Parse);
            let action = match parse_action(&raw, agent.max_wait_ms) {
                Ok(action) => action,
                Err(e) => {
                    let msg = truncate_error(&e.to_string());
                    warn!(tick, error_type = e.classify().error_type, error = %msg, "Unusable model output");
                    state.record(tick, None, ActionOutcome::ParseError, msg.clone());
                    state.last_error = Some(msg);
                    continue;
                }
            };
            info!(tick, action = %action.summary(), "Action chosen");

            if let Action::Fail { reason } = &action {
                self.trace(tick, TickPhase::FailTerminal);
                let error = format!("agent gave up: {}", reason);
                state.record(tick, Some(action.clone()), ActionOutcome::Aborted, reason.clone());
                state.last_error = Some(error.clone());
                warn!(step = step.index, tick, reason = %reason, "Step failed by agent");
                return finish(state, false, tick, Some(error));
            }

            if let Action::Assert { expect } = &action {
                self.trace(tick, TickPhase::AssertCheck);
                let result = evaluate(page, expect, expectation_timeout).await;
                let detail = result.detail.clone().unwrap_or_else(|| "passed".to_string());
                if result.passed {
                    state.record(tick, Some(action.clone()), ActionOutcome::AssertPassed, detail);
                    state.last_error = None;
                } else {
                    state.last_error = Some(format!("assertion failed: {} ({})", expect.describe(), detail));
                    state.record(tick, Some(action.clone()), ActionOutcome::AssertFailed, detail);
                }
                continue;
            }

            let Some(browser_action) = action.to_browser_action(&current_url) else {
                continue;
            };

            self.trace(tick, TickPhase::Execute);
            match execute_browser_action(page, &browser_action, timeouts).await {
                Ok(detail) => {
                    state.record(tick, Some(action.clone()), ActionOutcome::Ok, detail);
                    state.last_error = None;
                }
                Err(e) => {
                    let msg = truncate_error(&e.to_string());
                    warn!(
                        tick,
                        action = %action.summary(),
                        error_type = e.classify().error_type,
                        error = %msg,
                        "Action failed"
                    );
                    state.record(tick, Some(action.clone()), ActionOutcome::Failed, msg.clone());
                    state.last_error = Some(msg);
                }
            }

            self.trace(tick, TickPhase::PostDelay);
            tokio::time::sleep(Duration::from_millis(agent.settle_delay_ms)).await;
            if browser_action.may_navigate() {
                let wait = Duration::from_millis(agent.load_state_timeout_ms);
                if let Err(e) = page.wait_for_load_state(LoadState::Load, wait).await {
                    debug!(tick, error = %e, "Load state not reached, continuing");
                }
            }

            if !step.expectations.is_empty() {
                self.trace(tick, TickPhase::ExpectationCheck);
                let (all_passed, results) = evaluate_all(page, &step.expectations, expectation_timeout).await;
                state.expectation_results = results;
                if all_passed {
                    info!(step = step.index, ticks_used = tick, "Expectations met");
                    return finish(state, true, tick, None);
                }
            }
        }

        if step.expectations.is_empty() {
            info!(step = step.index, ticks_used = max_ticks, "Tick budget used, no expectations declared");
            return finish(state, true, max_ticks, None);
        }

        let unmet: Vec<String> = if state.expectation_results.is_empty() {
            step.expectations.iter().map(Expectation::describe).collect()
        } else {
            state.expectation_results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| r.expectation.describe())
                .collect()
        };
        let error = format!(
            "tick budget exhausted after {} ticks; unmet expectations: {}",
            max_ticks,
            unmet.join(", ")
        );
        warn!(step = step.index, error = %error, "Step timed out");
        finish(state, false, max_ticks, Some(error))
    }

    async fn call_model(&self, prompt: &str) -> Result<String, PilotError> {
        let messages = [Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)];
        let limit = Duration::from_secs(self.config.llm.timeout_secs) + MODEL_CALL_GRACE;
        let response = tokio::time::timeout(limit, self.llm.chat(&messages, &self.chat))
            .await
            .map_err(|_| PilotError::Timeout(format!("model call exceeded {}s", limit.as_secs())))??;
        debug!(
            model = %response.model,
            input_tokens = ?response.input_tokens,
            output_tokens = ?response.output_tokens,
            "Model responded"
        );
        Ok(response.content)
    }
}
