use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::Utc;
use console::style;
use crate::cli::commands::RunArgs;
use crate::errors::PilotError;
use crate::llm::create_provider;
use crate::models::{CaseResult, RunReport};
use crate::reporting::write_run_report;
use crate::suite::{load_suite, SuiteRunner};
use crate::utils::formatting::{format_duration, format_pass_rate};
use super::{load_app_config, log_config_warnings, spinner};
use tracing::info;

pub async fn handle_run(args: RunArgs, config_path: Option<&Path>, quiet: bool) -> Result<(), PilotError> {
    let mut config = load_app_config(config_path, &args.llm).await?;
    if let Some(output) = &args.output {
        config.output.directory = output.display().to_string();
    }
    if let Some(ticks) = args.max_ticks {
        config.agent.max_ticks = ticks;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if args.parallel {
        config.runner.parallel = true;
    }
    if let Some(workers) = args.workers {
        config.runner.workers = workers;
    }
    log_config_warnings(&config);

    let suite = load_suite(&args.paths).await?;
    if suite.cases.is_empty() {
        return Err(PilotError::TestCase(format!(
            "no valid test cases found ({} invalid)",
            suite.invalid.len()
        )));
    }

    let llm: Arc<dyn crate::llm::LLMProvider> = Arc::from(create_provider(&config.llm)?);
    let provider = llm.provider_name().to_string();
    let model = llm.model_name().to_string();
    let config = Arc::new(config);

    let run_id = uuid::Uuid::new_v4().to_string();
    let run_dir = PathBuf::from(&config.output.directory).join(&run_id);
    info!(run_id = %run_id, provider = %provider, model = %model, cases = suite.cases.len(), "Starting run");

    let started_at = Utc::now();
    let runner = SuiteRunner::new(Arc::clone(&llm), Arc::clone(&config), run_dir.clone());
    let bar = spinner(quiet, format!("Running {} test case(s)", suite.cases.len()));
    let cases = runner.run_all(&suite.cases).await;
    bar.finish_and_clear();

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        provider,
        model,
        cases,
        invalid_files: suite.invalid,
    };
    write_run_report(&run_dir, &report).await?;

    if !quiet {
        print_summary(&report, &run_dir);
    }

    let summary = report.summary();
    if summary.failed > 0 {
        return Err(PilotError::TestFailures(format!(
            "{} of {} test case(s) failed; see {}",
            summary.failed,
            summary.total,
            run_dir.display()
        )));
    }
    Ok(())
}

fn case_line(case: &CaseResult) -> String {
    let mark = if case.success { style("PASS").green().bold() } else { style("FAIL").red().bold() };
    let mut line = format!(
        "  {} {} {}",
        mark,
        style(&case.name).bold(),
        style(format!("({})", format_duration(case.duration_ms))).dim()
    );
    if let Some(step) = case.failed_step() {
        let reason = step.error.as_deref().unwrap_or("expectations not met");
        line.push_str(&format!("\n       step {}: {}", step.index, reason));
    } else if let Some(error) = &case.error {
        line.push_str(&format!("\n       {}", error));
    }
    line
}

fn print_summary(report: &RunReport, run_dir: &Path) {
    let summary = report.summary();
    println!();
    for case in &report.cases {
        println!("{}", case_line(case));
    }
    for invalid in &report.invalid_files {
        println!("  {} {}", style("SKIP").yellow().bold(), invalid);
    }
    println!();
    println!(
        "  {} passed, {} failed, {} invalid  {}  {}",
        style(summary.passed).green(),
        style(summary.failed).red(),
        style(summary.invalid).yellow(),
        style(format_pass_rate(summary.passed, summary.total)).bold(),
        style(format_duration(report.duration_ms())).dim()
    );
    println!("  Results: {}", style(run_dir.display()).cyan());
}
