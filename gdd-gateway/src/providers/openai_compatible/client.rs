//! Streaming client for OpenAI-compatible Chat Completions endpoints.

use serde::{Deserialize, Serialize};

use crate::providers::provider::{
    CompletionRequest, Provider, ProviderError, TextStream, ensure_success,
};
use crate::providers::query_dump::dump_request;
use crate::providers::sse::{SseAction, SseEvent, decode_text_stream};

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    provider_name: String,
    dump_queries: bool,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

impl OpenAiCompatibleClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// `provider_name` is used in logs and query dumps.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            provider_name: provider_name.into(),
            dump_queries: false,
        }
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Enable or disable debug query logging
    pub fn with_dump_queries(mut self, enabled: bool) -> Self {
        self.dump_queries = enabled;
        self
    }
}

fn map_event(event: SseEvent) -> SseAction {
    let data = event.data.trim();
    if data == "[DONE]" {
        return SseAction::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(ChatCompletionChunk {
            error: Some(error), ..
        }) => SseAction::Error(ProviderError::ApiError {
            status: None,
            message: error.message,
        }),
        Ok(chunk) => {
            let text: String = chunk
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            if text.is_empty() {
                SseAction::Skip
            } else {
                SseAction::Text(text)
            }
        }
        Err(e) => SseAction::Error(ProviderError::InvalidFormat(format!(
            "unparseable chat completion chunk: {e}"
        ))),
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<TextStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        if self.dump_queries
            && let Ok(value) = serde_json::to_value(&body)
        {
            dump_request(&self.provider_name, &self.model, &value).await;
        }

        let mut builder = self.http_client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = ensure_success(builder.send().await?).await?;

        Ok(decode_text_stream(response.bytes_stream(), map_event))
    }

    fn clone_box(&self) -> Box<dyn Provider> {
        Box::new(self.clone())
    }
}
