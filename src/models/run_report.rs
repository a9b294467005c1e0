use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::case_result::CaseResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Test-case files rejected at load time.
    pub invalid: usize,
}

/// Everything written to `results.json` for one `run` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub cases: Vec<CaseResult>,
    pub invalid_files: Vec<String>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let passed = self.cases.iter().filter(|c| c.success).count();
        RunSummary {
            total: self.cases.len(),
            passed,
            failed: self.cases.len() - passed,
            invalid: self.invalid_files.len(),
        }
    }

    pub fn success(&self) -> bool {
        self.cases.iter().all(|c| c.success)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }
}
