//! Anthropic Messages API client with streaming output.

use gdd_core::ProviderType;
use serde::{Deserialize, Serialize};

use crate::providers::provider::{
    CompletionRequest, Provider, ProviderError, TextStream, ensure_success,
};
use crate::providers::query_dump::dump_request;
use crate::providers::sse::{SseAction, SseEvent, decode_text_stream};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dump_queries: bool,
}

/// Request body for the Messages API
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Streaming events we act on; everything else is ignored
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ErrorDetail },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: ProviderType::Anthropic.default_base_url().to_string(),
            dump_queries: false,
        }
    }

    /// Share a preconfigured HTTP client
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable debug query logging
    pub fn with_dump_queries(mut self, enabled: bool) -> Self {
        self.dump_queries = enabled;
        self
    }
}

fn map_event(event: SseEvent) -> SseAction {
    match serde_json::from_str::<StreamEvent>(&event.data) {
        Ok(StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        }) => SseAction::Text(text),
        Ok(StreamEvent::MessageStop) => SseAction::Done,
        Ok(StreamEvent::Error { error }) => SseAction::Error(ProviderError::ApiError {
            status: None,
            message: format!("{}: {}", error.kind, error.message),
        }),
        Ok(_) => SseAction::Skip,
        Err(e) => SseAction::Error(ProviderError::InvalidFormat(format!(
            "unparseable Anthropic event: {e}"
        ))),
    }
}

#[async_trait::async_trait]
impl Provider for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<TextStream, ProviderError> {
        let url = format!("{}/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: [UserMessage {
                role: "user",
                content: &request.prompt,
            }],
            stream: true,
        };

        if self.dump_queries
            && let Ok(value) = serde_json::to_value(&body)
        {
            dump_request("anthropic", &self.model, &value).await;
        }

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        Ok(decode_text_stream(response.bytes_stream(), map_event))
    }

    fn clone_box(&self) -> Box<dyn Provider> {
        Box::new(self.clone())
    }
}
