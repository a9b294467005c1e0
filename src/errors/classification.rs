use super::types::PilotError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    /// Transient errors are recorded against the current tick and the agent
    /// loop moves on; everything else ends the command.
    pub transient: bool,
}

impl PilotError {
    /// Classify this error to determine its type and whether the agent loop
    /// can absorb it.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Per-tick errors
            PilotError::RateLimit(_) => ErrorClassification {
                error_type: "RateLimitError",
                transient: true,
            },
            PilotError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                transient: true,
            },
            PilotError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                transient: true,
            },
            PilotError::OutputValidation(_) => ErrorClassification {
                error_type: "OutputValidationError",
                transient: true,
            },
            PilotError::LLMApi(_) => ErrorClassification {
                error_type: "LLMApiError",
                transient: true,
            },
            PilotError::Browser(_) => ErrorClassification {
                error_type: "BrowserError",
                transient: true,
            },
            PilotError::ElementNotFound(_) => ErrorClassification {
                error_type: "ElementNotFoundError",
                transient: true,
            },
            PilotError::Locator(_) => ErrorClassification {
                error_type: "LocatorError",
                transient: true,
            },

            // Terminal errors
            PilotError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                transient: false,
            },
            PilotError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                transient: false,
            },
            PilotError::TestCase(_) => ErrorClassification {
                error_type: "TestCaseError",
                transient: false,
            },
            PilotError::Recording(_) => ErrorClassification {
                error_type: "RecordingError",
                transient: false,
            },
            PilotError::Validation(_) => ErrorClassification {
                error_type: "ValidationError",
                transient: false,
            },
            PilotError::BrittleSelectors(_) => ErrorClassification {
                error_type: "BrittleSelectorsError",
                transient: false,
            },
            PilotError::NoValidRecordings(_) => ErrorClassification {
                error_type: "NoValidRecordingsError",
                transient: false,
            },
            PilotError::TestFailures(_) => ErrorClassification {
                error_type: "TestFailuresError",
                transient: false,
            },
            PilotError::Review(_) => ErrorClassification {
                error_type: "ReviewError",
                transient: false,
            },
            PilotError::Io(_) => ErrorClassification {
                error_type: "IoError",
                transient: false,
            },
            PilotError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                transient: false,
            },
            PilotError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                transient: false,
            },
            PilotError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                transient: false,
            },
        }
    }

    /// Process exit code used by the binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PilotError::Config(_) => 2,
            PilotError::BrittleSelectors(_) => 3,
            PilotError::NoValidRecordings(_) => 4,
            PilotError::TestFailures(_) => 5,
            _ => 1,
        }
    }
}
