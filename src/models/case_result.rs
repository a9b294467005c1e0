use serde::{Deserialize, Serialize};
use crate::agent::result::StepResult;

/// The outcome of one test case: its executed steps in order, plus the
/// goals of any steps skipped after the first failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub id: String,
    pub name: String,
    pub source: String,
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub skipped_steps: Vec<String>,
    /// Set when the case could not run at all (browser launch, navigation).
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CaseResult {
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }

    pub fn total_ticks(&self) -> u32 {
        self.steps.iter().map(|s| s.ticks_used).sum()
    }
}
