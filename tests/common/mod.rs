#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use webpilot::browser::locator::{resolve, Descriptor, ResolvedLocator};
use webpilot::browser::page::{LoadState, PageDriver};
use webpilot::config::AppConfig;
use webpilot::errors::PilotError;
use webpilot::llm::{ChatOptions, LLMProvider, LLMResponse, Message};

/// LLM provider that replays canned replies in order, then repeats the
/// fallback reply.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, PilotError>>>,
    fallback: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self::with_results(replies.into_iter().map(|r| Ok(r.to_string())).collect(), "{}")
    }

    pub fn with_results(replies: Vec<Result<String, PilotError>>, fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: fallback.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same text.
    pub fn repeating(reply: &str) -> Self {
        Self::with_results(Vec::new(), reply)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(&self, messages: &[Message], _options: &ChatOptions) -> Result<LLMResponse, PilotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        self.prompts.lock().unwrap().push(prompt);
        let next = self.replies.lock().unwrap().pop_front();
        let content = match next {
            Some(reply) => reply?,
            None => self.fallback.clone(),
        };
        Ok(LLMResponse { content, input_tokens: None, output_tokens: None, model: "scripted".to_string() })
    }

    async fn list_models(&self) -> Result<Vec<String>, PilotError> {
        Ok(vec!["scripted".to_string()])
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// An element on the fake page. Clicking it may navigate.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub locator: ResolvedLocator,
    pub navigates_to: Option<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    title: String,
    tree: String,
    text: String,
    elements: Vec<FakeElement>,
    log: Vec<String>,
    viewport: Option<(u32, u32)>,
}

/// In-memory page: visible text is a plain string, elements match by exact
/// resolved locator.
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                url: url.to_string(),
                title: "Fake page".to_string(),
                tree: "- main\n  - heading \"Welcome\"".to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn with_text(self, text: &str) -> Self {
        self.state.lock().unwrap().text = text.to_string();
        self
    }

    pub fn with_tree(self, tree: &str) -> Self {
        self.state.lock().unwrap().tree = tree.to_string();
        self
    }

    pub fn with_element(self, descriptor: Descriptor, navigates_to: Option<&str>) -> Self {
        self.state.lock().unwrap().elements.push(FakeElement {
            locator: resolve(&descriptor),
            navigates_to: navigates_to.map(str::to_string),
        });
        self
    }

    pub fn current_url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    /// Mutations in the order they happened.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.state.lock().unwrap().viewport
    }

    fn matches(&self, locator: &ResolvedLocator) -> usize {
        let state = self.state.lock().unwrap();
        let text_hit = match locator {
            ResolvedLocator::Text { text, .. } => state.text.contains(text.as_str()),
            _ => false,
        };
        state.elements.iter().filter(|e| &e.locator == locator).count() + usize::from(text_hit)
    }

    fn require(&self, locator: &ResolvedLocator) -> Result<(), PilotError> {
        if self.matches(locator) == 0 {
            return Err(PilotError::ElementNotFound(format!("{:?}", locator)));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn url(&self) -> Result<String, PilotError> {
        Ok(self.current_url())
    }

    async fn title(&self) -> Result<String, PilotError> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn aria_snapshot(&self) -> Result<String, PilotError> {
        Ok(self.state.lock().unwrap().tree.clone())
    }

    async fn inner_text(&self) -> Result<String, PilotError> {
        Ok(self.state.lock().unwrap().text.clone())
    }

    async fn count(&self, locator: &ResolvedLocator) -> Result<usize, PilotError> {
        Ok(self.matches(locator))
    }

    async fn is_visible(&self, locator: &ResolvedLocator, _timeout: Duration) -> Result<bool, PilotError> {
        Ok(self.matches(locator) > 0)
    }

    async fn click(&self, locator: &ResolvedLocator, _timeout: Duration) -> Result<(), PilotError> {
        self.require(locator)?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("click {:?}", locator));
        let target = state.elements.iter().find(|e| &e.locator == locator).and_then(|e| e.navigates_to.clone());
        if let Some(url) = target {
            state.url = url;
        }
        Ok(())
    }

    async fn fill(&self, locator: &ResolvedLocator, text: &str, _timeout: Duration) -> Result<(), PilotError> {
        self.require(locator)?;
        self.state.lock().unwrap().log.push(format!("fill {}", text));
        Ok(())
    }

    async fn press(&self, _locator: Option<&ResolvedLocator>, key: &str, _timeout: Duration) -> Result<(), PilotError> {
        self.state.lock().unwrap().log.push(format!("press {}", key));
        Ok(())
    }

    async fn select_option(&self, locator: &ResolvedLocator, value: &str, _timeout: Duration) -> Result<(), PilotError> {
        self.require(locator)?;
        self.state.lock().unwrap().log.push(format!("select {}", value));
        Ok(())
    }

    async fn set_checked(&self, locator: &ResolvedLocator, checked: bool, _timeout: Duration) -> Result<(), PilotError> {
        self.require(locator)?;
        self.state.lock().unwrap().log.push(format!("check {}", checked));
        Ok(())
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), PilotError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("goto {}", url));
        state.url = url.to_string();
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout: Duration) -> Result<(), PilotError> {
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), PilotError> {
        self.state.lock().unwrap().viewport = Some((width, height));
        Ok(())
    }

    async fn close(&self) -> Result<(), PilotError> {
        Ok(())
    }
}

/// Defaults with the waits shrunk for tests.
pub fn fast_config(max_ticks: u32) -> Arc<AppConfig> {
    let mut config = AppConfig::default();
    config.agent.max_ticks = max_ticks;
    config.agent.settle_delay_ms = 0;
    config.agent.load_state_timeout_ms = 10;
    config.agent.expectation_timeout_ms = 10;
    Arc::new(config)
}

pub fn provider(p: ScriptedProvider) -> (Arc<ScriptedProvider>, Arc<dyn LLMProvider>) {
    let concrete = Arc::new(p);
    let erased: Arc<dyn LLMProvider> = concrete.clone();
    (concrete, erased)
}
