use std::path::{Path, PathBuf};
use console::style;
use crate::cli::commands::{LlmArgs, ValidateArgs};
use crate::errors::PilotError;
use crate::recording::generator::{find_recordings, load_recording};
use crate::suite::testcase::{collect_case_files, load_test_case};
use super::load_app_config;
use tracing::debug;

fn is_recording(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Expand directories into their test cases and recordings.
fn expand(paths: &[PathBuf]) -> Result<Vec<PathBuf>, PilotError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(collect_case_files(std::slice::from_ref(path))?);
            files.extend(find_recordings(path)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

pub async fn handle_validate(args: ValidateArgs, config_path: Option<&Path>, quiet: bool) -> Result<(), PilotError> {
    let config = load_app_config(config_path, &LlmArgs::default()).await?;
    let warnings = config.warnings();
    if !quiet {
        println!("  {} configuration", style("ok").green());
        for warning in &warnings {
            println!("    {} {}", style("warning:").yellow(), warning);
        }
    }

    let files = expand(&args.paths)?;
    let mut invalid = 0;
    for file in &files {
        let result = if is_recording(file) {
            load_recording(file).await.map(|(r, o, a)| {
                format!("{} steps, {} override(s), {} assertion(s)", r.steps.len(), o.len(), a.len())
            })
        } else {
            load_test_case(file).await.map(|c| format!("{} step(s)", c.steps.len()))
        };
        match result {
            Ok(detail) => {
                debug!(file = %file.display(), "Valid");
                if !quiet {
                    println!("  {} {} {}", style("ok").green(), file.display(), style(detail).dim());
                }
            }
            Err(e) => {
                invalid += 1;
                println!("  {} {}: {}", style("invalid").red().bold(), file.display(), e);
            }
        }
    }

    if invalid > 0 {
        return Err(PilotError::Validation(format!("{} of {} file(s) invalid", invalid, files.len())));
    }
    Ok(())
}
