//! gdd-gateway: AI generation and enhancement for game design documents.
//!
//! Builds prompts from the document, streams completions from the
//! configured providers and stores section content.

pub mod api_error;
pub mod circuit_breaker;
pub mod enhancement;
pub mod error;
pub mod generation;
pub mod model_registry;
pub mod prompt;
pub mod providers;
pub mod server;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::AiError;
pub use model_registry::{ModelEntry, ModelRegistry, OpenedStream};
pub use providers::provider::{CompletionRequest, Provider, ProviderError, TextStream};
pub use state::AppState;
