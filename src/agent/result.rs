use serde::{Deserialize, Serialize};
use super::action::Action;
use super::expectations::ExpectationResult;
use super::observation::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Executed against the page.
    Ok,
    /// Execution attempted and failed (element missing, timeout, ...).
    Failed,
    /// Model output could not be turned into an action.
    ParseError,
    /// The model call itself failed.
    ModelError,
    AssertPassed,
    AssertFailed,
    /// The model gave up with a `fail` action.
    Aborted,
}

impl ActionOutcome {
    pub fn executed(&self) -> bool {
        matches!(self, Self::Ok | Self::Failed)
    }
}

/// One entry of a step's ordered action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub tick: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub outcome: ActionOutcome,
    pub detail: String,
}

impl ActionRecord {
    pub fn summary(&self) -> String {
        let what = self.action.as_ref().map(Action::summary).unwrap_or_else(|| "(no action)".to_string());
        format!("tick {}: {} -> {:?}: {}", self.tick, what, self.outcome, self.detail)
    }
}

/// Diagnostics attached to a failed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugBundle {
    pub observation: Option<Observation>,
    pub raw_response: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    /// Goal with variable placeholders masked.
    pub goal: String,
    pub success: bool,
    pub ticks_used: u32,
    pub actions: Vec<ActionRecord>,
    pub expectations: Vec<ExpectationResult>,
    pub error: Option<String>,
    pub debug: Option<DebugBundle>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn executed_actions(&self) -> usize {
        self.actions.iter().filter(|a| a.outcome.executed()).count()
    }
}
