//! Model catalog with one provider client per usable model.

use std::sync::Arc;
use std::time::Duration;

use gdd_core::{Config, ModelOption, ModelSpec, ProviderType};
use tracing::{info, warn};

use crate::circuit_breaker::{CircuitBreaker, CooldownReason};
use crate::error::AiError;
use crate::providers::anthropic::AnthropicClient;
use crate::providers::gemini::GeminiClient;
use crate::providers::openai_compatible::OpenAiCompatibleClient;
use crate::providers::{CompletionRequest, Provider, ProviderError, TextStream, build_http_client};

/// A catalog model and its client, when its provider has a credential.
#[derive(Clone)]
pub struct ModelEntry {
    pub spec: ModelSpec,
    client: Option<Arc<dyn Provider>>,
}

impl ModelEntry {
    pub fn new(spec: ModelSpec, client: Option<Arc<dyn Provider>>) -> Self {
        Self { spec, client }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// The provider client, or `MissingCredential` when the key is absent.
    pub fn client(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.client
            .clone()
            .ok_or(ProviderError::MissingCredential(self.spec.provider))
    }
}

/// An opened completion stream and the model that serves it.
pub struct OpenedStream {
    pub model_id: String,
    pub stream: TextStream,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    default_chain: Vec<String>,
    breaker: CircuitBreaker,
}

impl ModelRegistry {
    /// Build clients for every model whose provider key is configured.
    ///
    /// Makes no network calls.
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.settings;
        let http_client =
            build_http_client(Duration::from_secs(settings.generation.request_timeout_seconds));
        let dump_queries = settings.logging.dump_queries;

        let entries = config
            .model_specs()
            .into_iter()
            .map(|spec| {
                let client = match config.api_key(spec.provider) {
                    Some(api_key) => Some(build_client(&spec, api_key, &http_client, dump_queries)),
                    None => {
                        info!(
                            "Skipping model '{}' ({}) - no {} configured",
                            spec.id,
                            spec.provider,
                            spec.provider.env_var()
                        );
                        None
                    }
                };
                ModelEntry::new(spec, client)
            })
            .collect();

        Self::from_entries(entries, config.default_model_chain())
    }

    pub fn from_entries(entries: Vec<ModelEntry>, default_chain: Vec<String>) -> Self {
        Self {
            entries,
            default_chain,
            breaker: CircuitBreaker::new(),
        }
    }

    /// Every model in catalog order with its availability.
    pub fn list_models(&self) -> Vec<ModelOption> {
        self.entries
            .iter()
            .map(|entry| ModelOption::from_spec(&entry.spec, entry.is_available()))
            .collect()
    }

    pub fn default_chain(&self) -> &[String] {
        &self.default_chain
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|entry| entry.spec.id == model_id)
    }

    /// Models a request would use, in order of preference.
    ///
    /// An explicit id resolves to exactly that model, whether or not it has
    /// a credential. `None` resolves to the default chain.
    pub fn resolve_model(&self, model_id: Option<&str>) -> Result<Vec<&ModelEntry>, AiError> {
        match model_id {
            Some(id) => self
                .get(id)
                .map(|entry| vec![entry])
                .ok_or_else(|| AiError::UnknownModel(id.to_string())),
            None => {
                let chain: Vec<&ModelEntry> =
                    self.default_chain.iter().filter_map(|id| self.get(id)).collect();
                if chain.is_empty() {
                    return Err(AiError::UnknownModel(self.default_chain.join(", ")));
                }
                Ok(chain)
            }
        }
    }

    /// Open a completion stream.
    ///
    /// With an explicit id only that model is tried. Without one the default
    /// chain is walked, skipping models on cooldown; a rate limit or server
    /// error moves on to the next model. Failures after the first chunk are
    /// not retried.
    pub async fn open_stream(
        &self,
        model_id: Option<&str>,
        request: CompletionRequest,
    ) -> Result<OpenedStream, AiError> {
        let candidates = self.resolve_model(model_id)?;
        let candidates = if model_id.is_some() {
            candidates
        } else {
            let ids: Vec<String> = candidates.iter().map(|e| e.spec.id.clone()).collect();
            let available = self.breaker.available(&ids);
            if available.is_empty() {
                // Everything is cooling down; trying beats failing outright.
                candidates
            } else {
                candidates
                    .into_iter()
                    .filter(|entry| available.contains(&entry.spec.id.as_str()))
                    .collect()
            }
        };

        let mut last_error = None;
        let total = candidates.len();
        for (index, entry) in candidates.into_iter().enumerate() {
            let id = entry.spec.id.as_str();
            let result = match entry.client() {
                Ok(client) => client.stream_completion(request.clone()).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(stream) => {
                    self.breaker.record_success(id);
                    return Ok(OpenedStream {
                        model_id: id.to_string(),
                        stream,
                    });
                }
                Err(error) => {
                    let reason = CooldownReason::from_error(&error);
                    if let Some(reason) = reason {
                        self.breaker.record_failure(id, reason);
                    }
                    let retryable = model_id.is_none()
                        && index + 1 < total
                        && (reason.is_some()
                            || matches!(error, ProviderError::MissingCredential(_)));
                    warn!(
                        model_id = id,
                        status = error.status(),
                        retryable,
                        "Opening completion stream failed: {}",
                        error
                    );
                    last_error = Some(AiError::Provider {
                        model_id: id.to_string(),
                        source: error,
                    });
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::UnknownModel(model_id.unwrap_or_default().to_string())))
    }
}

fn build_client(
    spec: &ModelSpec,
    api_key: &str,
    http_client: &reqwest::Client,
    dump_queries: bool,
) -> Arc<dyn Provider> {
    match spec.provider {
        ProviderType::Anthropic => Arc::new(
            AnthropicClient::new(api_key, &spec.api_model)
                .with_http_client(http_client.clone())
                .with_dump_queries(dump_queries),
        ),
        ProviderType::Google => Arc::new(
            GeminiClient::new(api_key, &spec.api_model)
                .with_http_client(http_client.clone())
                .with_dump_queries(dump_queries),
        ),
        ProviderType::OpenAi | ProviderType::XAi | ProviderType::Groq => {
            let base_url = spec
                .base_url
                .clone()
                .unwrap_or_else(|| spec.provider.default_base_url().to_string());
            Arc::new(
                OpenAiCompatibleClient::new(
                    base_url,
                    Some(api_key.to_string()),
                    &spec.api_model,
                    spec.provider.as_str(),
                )
                .with_http_client(http_client.clone())
                .with_dump_queries(dump_queries),
            )
        }
    }
}
