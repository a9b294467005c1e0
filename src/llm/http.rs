use std::time::Duration;
use reqwest::{Client, Response};
use serde_json::Value;
use crate::errors::PilotError;

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, PilotError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| PilotError::Config(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn send_error(backend: &str, e: reqwest::Error) -> PilotError {
    if e.is_timeout() {
        PilotError::Timeout(format!("{} request timed out", backend))
    } else {
        PilotError::Network(format!("{} request failed: {}", backend, e))
    }
}

/// Map HTTP status to an error and decode the JSON body.
pub(crate) async fn json_body(backend: &str, resp: Response) -> Result<Value, PilotError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(PilotError::RateLimit(format!("{} rate limit", backend)));
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(PilotError::Authentication(format!("{} rejected the API key", backend)));
    }

    let data: Value = resp.json().await
        .map_err(|e| PilotError::LLMApi(format!("Failed to parse {} response: {}", backend, e)))?;

    if !status.is_success() {
        let message = error_message(&data).unwrap_or_else(|| status.to_string());
        return Err(PilotError::LLMApi(format!("{} returned {}: {}", backend, status.as_u16(), message)));
    }
    if let Some(message) = error_message(&data) {
        return Err(PilotError::LLMApi(message));
    }
    Ok(data)
}

fn error_message(data: &Value) -> Option<String> {
    match data.get("error")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other["message"].as_str().unwrap_or("Unknown").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_string() {
        assert_eq!(error_message(&json!({"error": "model not found"})).as_deref(), Some("model not found"));
    }

    #[test]
    fn test_error_message_object() {
        let data = json!({"error": {"message": "bad request", "type": "invalid"}});
        assert_eq!(error_message(&data).as_deref(), Some("bad request"));
    }

    #[test]
    fn test_no_error_message() {
        assert!(error_message(&json!({"choices": []})).is_none());
    }
}
