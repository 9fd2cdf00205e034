//! Built-in catalog of selectable models.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderType;

/// Model used when the caller does not pick one and settings do not override it.
pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4";

/// A catalog entry: public id plus the provider-side model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Id exposed to clients
    pub id: String,
    pub name: String,
    pub provider: ProviderType,
    /// Model identifier sent to the provider API
    pub api_model: String,
    pub description: String,
    /// Base URL override (custom OpenAI-compatible endpoints)
    pub base_url: Option<String>,
}

struct BuiltinModel {
    id: &'static str,
    name: &'static str,
    provider: ProviderType,
    api_model: &'static str,
    description: &'static str,
}

const BUILTIN_MODELS: &[BuiltinModel] = &[
    BuiltinModel {
        id: "claude-sonnet-4",
        name: "Claude Sonnet 4",
        provider: ProviderType::Anthropic,
        api_model: "claude-sonnet-4-20250514",
        description: "Balanced quality and speed, strong long-form writing",
    },
    BuiltinModel {
        id: "claude-3-5-haiku",
        name: "Claude 3.5 Haiku",
        provider: ProviderType::Anthropic,
        api_model: "claude-3-5-haiku-20241022",
        description: "Fast drafts at low cost",
    },
    BuiltinModel {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: ProviderType::OpenAi,
        api_model: "gpt-4o",
        description: "OpenAI flagship multimodal model",
    },
    BuiltinModel {
        id: "gpt-4o-mini",
        name: "GPT-4o mini",
        provider: ProviderType::OpenAi,
        api_model: "gpt-4o-mini",
        description: "Small and quick OpenAI model",
    },
    BuiltinModel {
        id: "gemini-2.0-flash",
        name: "Gemini 2.0 Flash",
        provider: ProviderType::Google,
        api_model: "gemini-2.0-flash",
        description: "Google's fast general model",
    },
    BuiltinModel {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        provider: ProviderType::Google,
        api_model: "gemini-1.5-pro",
        description: "Large context window for whole-document reasoning",
    },
    BuiltinModel {
        id: "grok-2",
        name: "Grok 2",
        provider: ProviderType::XAi,
        api_model: "grok-2-1212",
        description: "xAI general model",
    },
    BuiltinModel {
        id: "llama-3.3-70b",
        name: "Llama 3.3 70B (Groq)",
        provider: ProviderType::Groq,
        api_model: "llama-3.3-70b-versatile",
        description: "Open-weights model served with very low latency",
    },
];

/// The built-in catalog, in display order.
pub fn builtin_catalog() -> Vec<ModelSpec> {
    BUILTIN_MODELS
        .iter()
        .map(|m| ModelSpec {
            id: m.id.to_string(),
            name: m.name.to_string(),
            provider: m.provider,
            api_model: m.api_model.to_string(),
            description: m.description.to_string(),
            base_url: None,
        })
        .collect()
}

/// Ids of the built-in catalog, in display order.
pub const MODEL_CATALOG: [&str; 8] = [
    "claude-sonnet-4",
    "claude-3-5-haiku",
    "gpt-4o",
    "gpt-4o-mini",
    "gemini-2.0-flash",
    "gemini-1.5-pro",
    "grok-2",
    "llama-3.3-70b",
];

/// A model as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOption {
    pub id: String,
    pub name: String,
    pub provider: ProviderType,
    pub description: String,
    pub available: bool,
}

impl ModelOption {
    pub fn from_spec(spec: &ModelSpec, available: bool) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            provider: spec.provider,
            description: spec.description.clone(),
            available,
        }
    }
}
