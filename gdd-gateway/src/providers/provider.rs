//! Provider trait for abstracting different LLM providers.

use std::pin::Pin;

use futures::Stream;
use gdd_core::ProviderType;
use serde::Serialize;

/// Incremental text fragments from a provider, in arrival order.
///
/// An `Err` item ends the stream.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// A single-turn completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-2xx response, or an error event inside the stream (`status` is `None`)
    #[error("API error{}: {message}", status_suffix(.status))]
    ApiError { status: Option<u16>, message: String },

    #[error("No API key configured for {0} (set {var})", var = credential_var(.0))]
    MissingCredential(ProviderType),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn credential_var(provider: &ProviderType) -> &'static str {
    provider.env_var()
}

impl ProviderError {
    /// HTTP status of the failure, when the provider sent one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => *status,
            ProviderError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Provider trait for different LLM backends
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Provider-side model identifier
    fn model(&self) -> &str;

    /// Start a streaming completion.
    ///
    /// Resolves once the provider accepted the request; a rejected request
    /// (bad key, rate limit, server error) fails here rather than mid-stream.
    async fn stream_completion(&self, request: CompletionRequest) -> Result<TextStream, ProviderError>;

    /// Clone the provider (boxed)
    fn clone_box(&self) -> Box<dyn Provider>;
}

impl Clone for Box<dyn Provider> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Turn a non-2xx response into [`ProviderError::ApiError`].
///
/// Uses the `error.message` field of a JSON body when there is one.
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: Some(status.as_u16()),
        message: error_message_from_body(&body),
    })
}

pub(crate) fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            let error = json.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(500).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_json_body() {
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Slow down"}}"#;
        assert_eq!(error_message_from_body(body), "Slow down");
    }

    #[test]
    fn test_error_message_from_plain_body() {
        assert_eq!(error_message_from_body("  Bad gateway \n"), "Bad gateway");
        assert_eq!(error_message_from_body(r#"{"error":"nope"}"#), "nope");
    }

    #[test]
    fn test_api_error_display() {
        let err = ProviderError::ApiError {
            status: Some(429),
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 429): rate limited");
        assert_eq!(err.status(), Some(429));

        let err = ProviderError::ApiError {
            status: None,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error: overloaded");
    }

    #[test]
    fn test_missing_credential_names_env_var() {
        let err = ProviderError::MissingCredential(ProviderType::Groq);
        assert_eq!(
            err.to_string(),
            "No API key configured for groq (set GROQ_API_KEY)"
        );
    }
}
