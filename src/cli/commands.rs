use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "webpilot",
    version = env!("WEBPILOT_VERSION"),
    long_version = concat!(env!("WEBPILOT_VERSION"), "\nbuilt ", env!("BUILD_TIMESTAMP")),
    about = "LLM-driven browser test agent and recording-to-Playwright generator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// YAML configuration file (defaults to ./webpilot.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run natural-language test cases against a live browser
    Run(RunArgs),
    /// Convert recorded traces into Playwright replay scripts
    Generate(GenerateArgs),
    /// Propose locator overrides for a failing replay
    Review(ReviewArgs),
    /// Check configuration, test cases and recordings without running them
    Validate(ValidateArgs),
    /// List known LLM providers and probe the configured backend
    Models(ModelsArgs),
}

/// LLM settings that override the configuration file.
#[derive(Args, Clone, Default)]
pub struct LlmArgs {
    /// LLM provider: ollama, openai
    #[arg(long)]
    pub provider: Option<String>,

    /// LLM model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// LLM endpoint base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Test-case YAML files or directories containing them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Output directory for run results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tick budget per step
    #[arg(long)]
    pub max_ticks: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Run test cases concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Maximum concurrent test cases with --parallel
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Clone)]
pub struct GenerateArgs {
    /// Directory of recorded trace files (*.json)
    #[arg(short, long, default_value = "./recordings")]
    pub recordings: PathBuf,

    /// Directory for generated scripts
    #[arg(short, long, default_value = "./tests/generated")]
    pub output: PathBuf,

    /// Fail when a brittle selector is used without an override
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Clone)]
pub struct ReviewArgs {
    /// Recorded trace file
    #[arg(short, long)]
    pub recording: PathBuf,

    /// Failure snapshot (e.g. a step-N-failure.txt from a run)
    #[arg(short, long)]
    pub failure: PathBuf,

    /// Override file to merge into (defaults to <recording>.overrides.json)
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Print the merged overrides without writing them
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Test-case YAML files, recording JSON files, or directories of either
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Clone)]
pub struct ModelsArgs {
    /// Skip probing the configured backend
    #[arg(long)]
    pub offline: bool,

    #[command(flatten)]
    pub llm: LlmArgs,
}
