use crate::agent::result::{ActionOutcome, StepResult};
use crate::models::{CaseResult, RunReport};
use crate::utils::formatting::{format_duration, format_pass_rate};

pub fn format_step_markdown(step: &StepResult) -> String {
    let status = if step.success { "PASS" } else { "FAIL" };
    let mut out = format!(
        "#### Step {} [{}] {}\n\n- Ticks: {}\n- Duration: {}\n",
        step.index,
        status,
        step.goal,
        step.ticks_used,
        format_duration(step.duration_ms),
    );
    if let Some(error) = &step.error {
        out.push_str(&format!("- Error: {}\n", error));
    }
    if !step.expectations.is_empty() {
        out.push_str("\n| Expectation | Result |\n|---|---|\n");
        for r in &step.expectations {
            let verdict = if r.passed { "pass" } else { "fail" };
            out.push_str(&format!("| {} | {} |\n", r.expectation.describe().replace('|', "\\|"), verdict));
        }
    }
    if !step.actions.is_empty() {
        out.push_str("\n```\n");
        for record in &step.actions {
            out.push_str(&record.summary());
            out.push('\n');
        }
        out.push_str("```\n");
    }
    out
}

pub fn format_case_markdown(case: &CaseResult) -> String {
    let status = if case.success { "PASS" } else { "FAIL" };
    let mut out = format!("### {} [{}]\n\n`{}` from {}\n\n", case.name, status, case.id, case.source);
    if let Some(error) = &case.error {
        out.push_str(&format!("**Could not run:** {}\n\n", error));
    }
    for step in &case.steps {
        out.push_str(&format_step_markdown(step));
        out.push('\n');
    }
    for goal in &case.skipped_steps {
        out.push_str(&format!("- skipped: {}\n", goal));
    }
    out
}

pub fn format_summary_markdown(report: &RunReport) -> String {
    let summary = report.summary();
    let mut out = format!(
        "# Test Run {}\n\n- Model: {} ({})\n- Started: {}\n- Duration: {}\n- Passed: {}\n\n",
        report.run_id,
        report.model,
        report.provider,
        report.started_at.to_rfc3339(),
        format_duration(report.duration_ms()),
        format_pass_rate(summary.passed, summary.total),
    );
    out.push_str("| Case | Result | Steps | Ticks |\n|---|---|---|---|\n");
    for case in &report.cases {
        out.push_str(&format!(
            "| {} | {} | {}/{} | {} |\n",
            case.name.replace('|', "\\|"),
            if case.success { "pass" } else { "fail" },
            case.steps.iter().filter(|s| s.success).count(),
            case.steps.len() + case.skipped_steps.len(),
            case.total_ticks(),
        ));
    }
    if !report.invalid_files.is_empty() {
        out.push_str("\n## Invalid test cases\n\n");
        for invalid in &report.invalid_files {
            out.push_str(&format!("- {}\n", invalid));
        }
    }
    out.push_str("\n## Details\n\n");
    for case in &report.cases {
        out.push_str(&format_case_markdown(case));
        out.push('\n');
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn outcome_class(outcome: ActionOutcome) -> &'static str {
    match outcome {
        ActionOutcome::Ok | ActionOutcome::AssertPassed => "ok",
        _ => "bad",
    }
}

/// Self-contained HTML report; every interpolated value is escaped.
pub fn format_html_report(report: &RunReport) -> String {
    let summary = report.summary();
    let mut body = String::new();
    for case in &report.cases {
        let class = if case.success { "pass" } else { "fail" };
        body.push_str(&format!(
            "<section class=\"case {}\"><h2>{} <small>{}</small></h2>\n",
            class,
            escape_html(&case.name),
            escape_html(&case.id),
        ));
        if let Some(error) = &case.error {
            body.push_str(&format!("<p class=\"error\">{}</p>\n", escape_html(error)));
        }
        for step in &case.steps {
            let class = if step.success { "pass" } else { "fail" };
            body.push_str(&format!(
                "<details class=\"step {}\"{}><summary>Step {}: {} ({} ticks, {})</summary>\n",
                class,
                if step.success { "" } else { " open" },
                step.index,
                escape_html(&step.goal),
                step.ticks_used,
                format_duration(step.duration_ms),
            ));
            if let Some(error) = &step.error {
                body.push_str(&format!("<p class=\"error\">{}</p>\n", escape_html(error)));
            }
            body.push_str("<ol>\n");
            for record in &step.actions {
                body.push_str(&format!(
                    "<li class=\"{}\">{}</li>\n",
                    outcome_class(record.outcome),
                    escape_html(&record.summary()),
                ));
            }
            body.push_str("</ol>\n");
            if let Some(obs) = step.debug.as_ref().and_then(|d| d.observation.as_ref()) {
                body.push_str(&format!(
                    "<p>Last page: {} ({})</p><pre>{}</pre>\n",
                    escape_html(&obs.url),
                    escape_html(&obs.title),
                    escape_html(&obs.ax_tree),
                ));
            }
            body.push_str("</details>\n");
        }
        for goal in &case.skipped_steps {
            body.push_str(&format!("<p class=\"skipped\">skipped: {}</p>\n", escape_html(goal)));
        }
        body.push_str("</section>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>webpilot run {run_id}</title>
<style>
body {{ font-family: system-ui, sans-serif; margin: 2rem; }}
.pass h2, details.pass > summary {{ color: #1a7f37; }}
.fail h2, details.fail > summary {{ color: #cf222e; }}
li.bad, .error {{ color: #cf222e; }}
.skipped {{ color: #6e7781; }}
pre {{ background: #f6f8fa; padding: 1rem; overflow-x: auto; }}
</style>
</head>
<body>
<h1>webpilot run {run_id}</h1>
<p>{passed} passed, {failed} failed, {invalid} invalid. Model {model}. Duration {duration}.</p>
{body}</body>
</html>
"#,
        run_id = escape_html(&report.run_id),
        passed = summary.passed,
        failed = summary.failed,
        invalid = summary.invalid,
        model = escape_html(&report.model),
        duration = format_duration(report.duration_ms()),
        body = body,
    )
}
