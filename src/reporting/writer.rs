use std::path::{Path, PathBuf};
use crate::errors::PilotError;
use crate::models::RunReport;
use super::formatter::{format_html_report, format_summary_markdown};
use tracing::info;

pub const RESULTS_FILE: &str = "results.json";
pub const SUMMARY_FILE: &str = "summary.md";
pub const HTML_FILE: &str = "report.html";

/// Write `results.json`, `summary.md` and `report.html` into `run_dir`.
pub async fn write_run_report(run_dir: &Path, report: &RunReport) -> Result<Vec<PathBuf>, PilotError> {
    tokio::fs::create_dir_all(run_dir).await?;

    let outputs = [
        (RESULTS_FILE, serde_json::to_string_pretty(report)?),
        (SUMMARY_FILE, format_summary_markdown(report)),
        (HTML_FILE, format_html_report(report)),
    ];

    let mut written = Vec::with_capacity(outputs.len());
    for (name, content) in outputs {
        let path = run_dir.join(name);
        tokio::fs::write(&path, content).await?;
        written.push(path);
    }
    info!(dir = %run_dir.display(), "Run report written");
    Ok(written)
}
