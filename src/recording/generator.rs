use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Serialize;
use serde_json::Value;
use crate::browser::locator::Descriptor;
use crate::errors::PilotError;
use super::codegen;
use super::scorer::best_selector;
use super::sidecars::{
    assertion_map, is_sidecar, load_assertions, load_overrides, override_map, sidecar_paths,
    validate_assertions, validate_overrides, AssertionCheck, AssertionEntry, OverrideEntry,
};
use super::types::Recording;
use tracing::{info, warn};

pub const BRITTLENESS_REPORT: &str = "brittleness-report.json";
pub const SCRIPT_SUFFIX: &str = ".spec.ts";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub recordings_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Fail the run when a brittle selector is used without an override.
    pub strict: bool,
}

/// A step whose generated locator came from a brittle selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrittleEntry {
    pub recording: String,
    pub step: usize,
    pub action: String,
    pub selector: String,
    pub score: u32,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct GenerationReport {
    pub generated: Vec<PathBuf>,
    pub rejected: Vec<String>,
    pub brittle: Vec<BrittleEntry>,
    pub overrides_applied: usize,
}

/// A script rendered in memory, before anything is written.
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    pub code: String,
    pub brittle: Vec<BrittleEntry>,
    pub overrides_applied: usize,
}

/// Parse a trace file, telling HAR exports apart from other bad input.
pub fn parse_recording(content: &str) -> Result<Recording, PilotError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| PilotError::Recording(format!("not valid JSON: {}", e)))?;

    if value.pointer("/log/entries").is_some() {
        return Err(PilotError::Recording(
            "this is a HAR network capture, not a recording; export the flow from the \
             DevTools Recorder panel as JSON instead"
                .to_string(),
        ));
    }
    match value.get("steps") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(PilotError::Recording("'steps' must be an array".to_string())),
        None => return Err(PilotError::Recording("missing 'steps'; not a DevTools recording".to_string())),
    }

    serde_json::from_value(value).map_err(|e| PilotError::Recording(format!("invalid step: {}", e)))
}

/// Render one recording. Overrides replace the scorer's choice; brittle
/// scorer choices are reported.
pub fn generate_script(
    name: &str,
    source: &str,
    recording: &Recording,
    overrides: &BTreeMap<(usize, String), Descriptor>,
    assertions: &BTreeMap<usize, Vec<AssertionCheck>>,
) -> GeneratedScript {
    let mut brittle = Vec::new();
    let mut overrides_applied = 0;

    let title = if recording.title.trim().is_empty() { name } else { recording.title.as_str() };
    let overrides_file = format!("{}{}", name, super::sidecars::OVERRIDES_SUFFIX);
    let mut code = codegen::header(source, &overrides_file);
    code.push_str(&codegen::open_test(title));

    for (number, step) in recording.numbered_steps() {
        let target = match number {
            Some(index) if step.kind().targets_element() => match overrides.get(&(index, step.step_type.clone())) {
                Some(descriptor) => {
                    overrides_applied += 1;
                    Some(descriptor.clone())
                }
                None => {
                    let best = best_selector(&step.selector_groups());
                    if best.brittle {
                        brittle.push(BrittleEntry {
                            recording: name.to_string(),
                            step: index,
                            action: step.step_type.clone(),
                            selector: best.raw.clone(),
                            score: best.score,
                            reason: best.reason.clone(),
                        });
                    }
                    Some(best.descriptor)
                }
            },
            _ => None,
        };

        code.push_str(&codegen::step_code(number, step, target.as_ref()));
        if let Some((index, checks)) = number.and_then(|index| assertions.get(&index).map(|c| (index, c))) {
            code.push_str(&codegen::assertion_code(index, checks));
        }
    }
    code.push_str(codegen::close_test());

    GeneratedScript { code, brittle, overrides_applied }
}

/// Trace files in `dir`: every `*.json` that is not a sidecar, sorted.
pub fn find_recordings(dir: &Path) -> Result<Vec<PathBuf>, PilotError> {
    if !dir.is_dir() {
        return Err(PilotError::Recording(format!("not a directory: {}", dir.display())));
    }
    let pattern = dir.join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| PilotError::Recording(format!("bad path {}: {}", dir.display(), e)))?
        .filter_map(Result::ok)
        .filter(|p| !is_sidecar(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Read a trace and its sidecars, checking every sidecar reference against
/// the trace.
pub async fn load_recording(path: &Path) -> Result<(Recording, Vec<OverrideEntry>, Vec<AssertionEntry>), PilotError> {
    let content = tokio::fs::read_to_string(path).await?;
    let recording = parse_recording(&content)?;

    let (overrides_path, assertions_path) = sidecar_paths(path);
    let overrides = load_overrides(&overrides_path).await?;
    validate_overrides(&recording, &overrides)?;
    let assertions = load_assertions(&assertions_path).await?;
    validate_assertions(&recording, &assertions)?;
    Ok((recording, overrides, assertions))
}

async fn prepare(path: &Path) -> Result<(String, GeneratedScript), PilotError> {
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("recording").to_string();
    let (recording, overrides, assertions) = load_recording(path).await?;

    let source = path.file_name().and_then(|n| n.to_str()).unwrap_or(&name).to_string();
    let script = generate_script(&name, &source, &recording, &override_map(&overrides), &assertion_map(&assertions));
    Ok((name, script))
}

fn strict_failure(brittle: &[BrittleEntry]) -> PilotError {
    let mut msg = String::new();
    for b in brittle {
        msg.push_str(&format!(
            "  {} step {} ({}): {} [{}]\n",
            b.recording, b.step, b.action, b.reason, b.selector
        ));
    }
    msg.push_str(
        "Add an entry for each step to <recording>.overrides.json, e.g.\n  \
         {\"overrides\": [{\"step\": N, \"action\": \"click\", \"locator\": {\"kind\": \"role\", \"role\": \"button\", \"name\": \"Save\"}}]}\n\
         or run `webpilot review` with a failure snapshot to get suggestions.",
    );
    PilotError::BrittleSelectors(msg)
}

/// Convert every recording in the directory. Invalid recordings are listed
/// and skipped; the run fails only when none were valid, or in strict mode
/// when a brittle selector was used without an override.
pub async fn generate(options: &GenerateOptions) -> Result<GenerationReport, PilotError> {
    let files = find_recordings(&options.recordings_dir)?;
    let mut report = GenerationReport::default();
    if files.is_empty() {
        info!(dir = %options.recordings_dir.display(), "No recordings found, nothing to generate");
        return Ok(report);
    }

    let mut scripts = Vec::new();
    for path in &files {
        match prepare(path).await {
            Ok((name, script)) => scripts.push((name, script)),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Rejected recording");
                report.rejected.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    if scripts.is_empty() {
        return Err(PilotError::NoValidRecordings(report.rejected.join("\n")));
    }

    for (_, script) in &scripts {
        report.brittle.extend(script.brittle.iter().cloned());
        report.overrides_applied += script.overrides_applied;
    }

    tokio::fs::create_dir_all(&options.output_dir).await?;
    if !report.brittle.is_empty() {
        let path = options.output_dir.join(BRITTLENESS_REPORT);
        tokio::fs::write(&path, serde_json::to_string_pretty(&report.brittle)?).await?;
        for b in &report.brittle {
            warn!(recording = %b.recording, step = b.step, action = %b.action, reason = %b.reason, "Brittle selector");
        }
    }

    if options.strict && !report.brittle.is_empty() {
        return Err(strict_failure(&report.brittle));
    }

    for (name, script) in &scripts {
        let path = options.output_dir.join(format!("{}{}", name, SCRIPT_SUFFIX));
        tokio::fs::write(&path, &script.code).await?;
        info!(path = %path.display(), "Replay script written");
        report.generated.push(path);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_har_detected() {
        let err = parse_recording(r#"{"log": {"version": "1.2", "entries": []}}"#).unwrap_err();
        assert!(err.to_string().contains("HAR"));
    }

    #[test]
    fn test_missing_steps() {
        let err = parse_recording(r#"{"title": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("missing 'steps'"));
    }

    #[test]
    fn test_not_json() {
        assert!(parse_recording("title: yaml").is_err());
    }

    #[test]
    fn test_strict_message_lists_steps() {
        let err = strict_failure(&[BrittleEntry {
            recording: "login".into(),
            step: 2,
            action: "click".into(),
            selector: "div > span:nth-child(2)".into(),
            score: 35,
            reason: "css, positional index".into(),
        }]);
        let msg = err.to_string();
        assert!(msg.contains("login step 2 (click)"));
        assert!(msg.contains("overrides.json"));
        assert_eq!(err.exit_code(), 3);
    }
}
