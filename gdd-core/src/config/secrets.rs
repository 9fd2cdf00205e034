//! Secrets configuration loaded from environment variables only.
//!
//! API keys are never read from or written to the settings file.

use std::env;

use crate::provider::ProviderType;

/// Provider API keys loaded exclusively from environment variables.
///
/// Every key is optional: a missing key only makes that provider's models
/// unavailable.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// env: ANTHROPIC_API_KEY
    pub anthropic_api_key: Option<String>,

    /// env: OPENAI_API_KEY
    pub openai_api_key: Option<String>,

    /// env: GOOGLE_GENERATIVE_AI_API_KEY, falling back to GEMINI_API_KEY
    pub google_api_key: Option<String>,

    /// env: XAI_API_KEY
    pub xai_api_key: Option<String>,

    /// env: GROQ_API_KEY
    pub groq_api_key: Option<String>,
}

/// Errors that can occur when reading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Secrets {
    /// Load secrets from environment variables, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env_inner()
    }

    /// Load from the environment without touching `.env`.
    pub(crate) fn from_env_inner() -> Self {
        Self {
            anthropic_api_key: read_var(ProviderType::Anthropic.env_var()),
            openai_api_key: read_var(ProviderType::OpenAi.env_var()),
            google_api_key: read_var(ProviderType::Google.env_var())
                .or_else(|| read_var("GEMINI_API_KEY")),
            xai_api_key: read_var(ProviderType::XAi.env_var()),
            groq_api_key: read_var(ProviderType::Groq.env_var()),
        }
    }

    /// API key for a provider, if configured.
    pub fn api_key(&self, provider: ProviderType) -> Option<&str> {
        match provider {
            ProviderType::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderType::OpenAi => self.openai_api_key.as_deref(),
            ProviderType::Google => self.google_api_key.as_deref(),
            ProviderType::XAi => self.xai_api_key.as_deref(),
            ProviderType::Groq => self.groq_api_key.as_deref(),
        }
    }

    /// API key for a provider, or an error naming the variable to set.
    pub fn require(&self, provider: ProviderType) -> Result<&str, SecretsError> {
        self.api_key(provider)
            .ok_or_else(|| SecretsError::MissingSecret(provider.env_var().to_string()))
    }

    pub fn has_provider(&self, provider: ProviderType) -> bool {
        self.api_key(provider).is_some()
    }

    /// Providers with a configured key, in declaration order.
    pub fn available_providers(&self) -> Vec<ProviderType> {
        ProviderType::ALL
            .into_iter()
            .filter(|provider| self.has_provider(*provider))
            .collect()
    }

    /// Set a key programmatically (tests and embedding).
    pub fn with_key(mut self, provider: ProviderType, key: impl Into<String>) -> Self {
        let slot = match provider {
            ProviderType::Anthropic => &mut self.anthropic_api_key,
            ProviderType::OpenAi => &mut self.openai_api_key,
            ProviderType::Google => &mut self.google_api_key,
            ProviderType::XAi => &mut self.xai_api_key,
            ProviderType::Groq => &mut self.groq_api_key,
        };
        *slot = Some(key.into());
        self
    }
}
