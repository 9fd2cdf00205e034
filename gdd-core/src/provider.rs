use serde::{Deserialize, Serialize};

/// LLM vendor behind a model option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    #[serde(rename = "xai")]
    XAi,
    Groq,
}

impl ProviderType {
    pub const ALL: [ProviderType; 5] = [
        ProviderType::Anthropic,
        ProviderType::OpenAi,
        ProviderType::Google,
        ProviderType::XAi,
        ProviderType::Groq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAi => "openai",
            ProviderType::Google => "google",
            ProviderType::XAi => "xai",
            ProviderType::Groq => "groq",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::OpenAi => "OPENAI_API_KEY",
            ProviderType::Google => "GOOGLE_GENERATIVE_AI_API_KEY",
            ProviderType::XAi => "XAI_API_KEY",
            ProviderType::Groq => "GROQ_API_KEY",
        }
    }

    /// Default API base URL for the provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "https://api.anthropic.com/v1",
            ProviderType::OpenAi => "https://api.openai.com/v1",
            ProviderType::Google => "https://generativelanguage.googleapis.com/v1beta",
            ProviderType::XAi => "https://api.x.ai/v1",
            ProviderType::Groq => "https://api.groq.com/openai/v1",
        }
    }

    /// Whether the provider speaks the OpenAI Chat Completions dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            ProviderType::OpenAi | ProviderType::XAi | ProviderType::Groq
        )
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderType::Anthropic),
            "openai" | "open_ai" => Ok(ProviderType::OpenAi),
            "google" | "gemini" => Ok(ProviderType::Google),
            "xai" | "x_ai" | "grok" => Ok(ProviderType::XAi),
            "groq" => Ok(ProviderType::Groq),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}
