//! Errors of the AI services.

use crate::prompt::TemplateError;
use crate::providers::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Game info or document content is too thin to generate from
    #[error("{message}")]
    InsufficientContext {
        message: String,
        filled_count: usize,
        has_game_info: bool,
    },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model {model_id} failed: {source}")]
    Provider {
        model_id: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl AiError {
    /// Model that failed, for provider errors.
    pub fn model_id(&self) -> Option<&str> {
        match self {
            AiError::Provider { model_id, .. } => Some(model_id),
            _ => None,
        }
    }
}
