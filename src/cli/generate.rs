use console::style;
use crate::cli::commands::GenerateArgs;
use crate::errors::PilotError;
use crate::recording::{generate, GenerateOptions, GenerationReport};
use crate::recording::generator::BRITTLENESS_REPORT;
use tracing::info;

pub async fn handle_generate(args: GenerateArgs, quiet: bool) -> Result<(), PilotError> {
    let options = GenerateOptions {
        recordings_dir: args.recordings.clone(),
        output_dir: args.output.clone(),
        strict: args.strict,
    };
    info!(recordings = %options.recordings_dir.display(), output = %options.output_dir.display(), strict = options.strict, "Generating replay scripts");

    let report = generate(&options).await?;
    if !quiet {
        print_report(&report, &args);
    }
    Ok(())
}

fn print_report(report: &GenerationReport, args: &GenerateArgs) {
    if report.generated.is_empty() && report.rejected.is_empty() {
        println!("  No recordings found in {}", style(args.recordings.display()).cyan());
        return;
    }
    for path in &report.generated {
        println!("  {} {}", style("wrote").green(), path.display());
    }
    for rejected in &report.rejected {
        println!("  {} {}", style("rejected").red(), rejected);
    }
    if report.overrides_applied > 0 {
        println!("  {} override(s) applied", report.overrides_applied);
    }
    if !report.brittle.is_empty() {
        println!(
            "  {} {} brittle selector(s); see {}",
            style("warning:").yellow().bold(),
            report.brittle.len(),
            args.output.join(BRITTLENESS_REPORT).display()
        );
        for b in &report.brittle {
            println!("    {} step {} ({}): {}", b.recording, b.step, b.action, style(&b.reason).dim());
        }
    }
}
