//! Streaming rewrite of existing section text.

use std::sync::Arc;

use gdd_core::{EnhanceRequest, GenerationSettings};
use tracing::{info, warn};

use crate::error::AiError;
use crate::model_registry::{ModelRegistry, OpenedStream};
use crate::prompt::{build_enhancement_prompt, enhancement_system_prompt};
use crate::providers::CompletionRequest;

pub struct EnhancementService {
    registry: Arc<ModelRegistry>,
    settings: GenerationSettings,
}

impl EnhancementService {
    pub fn new(registry: Arc<ModelRegistry>, settings: GenerationSettings) -> Self {
        Self { registry, settings }
    }

    /// Rewrite `request.text` with the default model chain.
    ///
    /// Text shorter than `min_enhance_chars` (after trimming) is rejected
    /// before any provider is contacted.
    pub async fn enhance(&self, request: &EnhanceRequest) -> Result<OpenedStream, AiError> {
        let text_chars = request.text.trim().chars().count();
        if text_chars < self.settings.min_enhance_chars {
            return Err(AiError::Validation(format!(
                "Text must be at least {} characters long to enhance",
                self.settings.min_enhance_chars
            )));
        }

        let completion = CompletionRequest {
            system: enhancement_system_prompt(&request.section_type),
            prompt: build_enhancement_prompt(request.action, &request.text, &request.game_context)?,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let opened = self
            .registry
            .open_stream(None, completion)
            .await
            .inspect_err(|e| {
                warn!(
                    action = %request.action,
                    section = %request.section_type,
                    model_id = e.model_id().unwrap_or("default"),
                    "Section enhancement failed: {}",
                    e
                );
            })?;

        info!(
            action = %request.action,
            section = %request.section_type,
            model_id = %opened.model_id,
            text_chars,
            "Streaming section enhancement"
        );
        Ok(opened)
    }
}
