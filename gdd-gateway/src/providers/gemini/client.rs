//! Google Gemini streaming client (`streamGenerateContent` with SSE).

use gdd_core::ProviderType;
use serde::{Deserialize, Serialize};

use crate::providers::provider::{
    CompletionRequest, Provider, ProviderError, TextStream, ensure_success,
};
use crate::providers::query_dump::dump_request;
use crate::providers::sse::{SseAction, SseEvent, decode_text_stream};

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dump_queries: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: ProviderType::Google.default_base_url().to_string(),
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

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

fn map_event(event: SseEvent) -> SseAction {
    match serde_json::from_str::<StreamChunk>(&event.data) {
        Ok(StreamChunk {
            error: Some(error), ..
        }) => SseAction::Error(ProviderError::ApiError {
            status: None,
            message: error.message,
        }),
        Ok(chunk) => {
            let text: String = chunk
                .candidates
                .into_iter()
                .take(1)
                .filter_map(|candidate| candidate.content)
                .flat_map(|content| content.parts)
                .filter_map(|part| part.text)
                .collect();
            if text.is_empty() {
                SseAction::Skip
            } else {
                SseAction::Text(text)
            }
        }
        Err(e) => SseAction::Error(ProviderError::InvalidFormat(format!(
            "unparseable Gemini chunk: {e}"
        ))),
    }
}

#[async_trait::async_trait]
impl Provider for GeminiClient {
    fn name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<TextStream, ProviderError> {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [TextPart {
                    text: &request.prompt,
                }],
            }],
            system_instruction: SystemInstruction {
                parts: [TextPart {
                    text: &request.system,
                }],
            },
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        if self.dump_queries
            && let Ok(value) = serde_json::to_value(&body)
        {
            dump_request("google", &self.model, &value).await;
        }

        let response = self
            .http_client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        // Gemini closes the stream after the last candidate; there is no done sentinel.
        Ok(decode_text_stream(response.bytes_stream(), map_event))
    }

    fn clone_box(&self) -> Box<dyn Provider> {
        Box::new(self.clone())
    }
}
