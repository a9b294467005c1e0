use thiserror::Error;

#[derive(Debug, Error)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Output validation error: {0}")]
    OutputValidation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Locator error: {0}")]
    Locator(String),

    #[error("Test case error: {0}")]
    TestCase(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Sidecar validation error: {0}")]
    Validation(String),

    #[error("Brittle selectors without overrides:\n{0}")]
    BrittleSelectors(String),

    #[error("No valid recordings:\n{0}")]
    NoValidRecordings(String),

    #[error("Test failures: {0}")]
    TestFailures(String),

    #[error("Review error: {0}")]
    Review(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
