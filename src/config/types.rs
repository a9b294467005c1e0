use serde::{Deserialize, Serialize};

/// Process-wide configuration. Built once at start-up and shared behind an
/// `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LLMConfig,
    pub browser: BrowserConfig,
    pub agent: AgentConfig,
    pub runner: RunnerConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Non-fatal configuration problems worth surfacing at start-up.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.llm.provider == "openai"
            && self.llm.api_key.as_deref().map_or(true, str::is_empty)
        {
            warnings.push(
                "llm.provider is 'openai' but no API key is configured; model calls will fail".to_string(),
            );
        }
        if self.agent.max_ticks == 0 {
            warnings.push("agent.max_ticks is 0; every step with expectations will time out".to_string());
        }
        if self.agent.history_window == 0 {
            warnings.push("agent.history_window is 0; the model will not see prior actions".to_string());
        }
        if self.runner.parallel && self.runner.workers <= 1 {
            warnings.push("runner.parallel is set but runner.workers <= 1; cases will run one at a time".to_string());
        }
        warnings
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: 0.0,
            top_p: 1.0,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub node_binary: String,
    pub headless: bool,
    pub viewport: Viewport,
    pub action_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node_binary: "node".to_string(),
            headless: true,
            viewport: Viewport::default(),
            action_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280, height: 800 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_ticks: u32,
    pub history_window: usize,
    pub settle_delay_ms: u64,
    pub load_state_timeout_ms: u64,
    pub expectation_timeout_ms: u64,
    pub ax_tree_max_chars: usize,
    pub visible_text_max_chars: usize,
    pub max_wait_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_ticks: 25,
            history_window: 5,
            settle_delay_ms: 500,
            load_state_timeout_ms: 3_000,
            expectation_timeout_ms: 3_000,
            ax_tree_max_chars: 6_000,
            visible_text_max_chars: 1_500,
            max_wait_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub parallel: bool,
    pub workers: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { parallel: false, workers: 2 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { directory: "./webpilot-results".to_string() }
    }
}
