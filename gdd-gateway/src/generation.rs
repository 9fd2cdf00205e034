//! Streaming generation of one subsection.

use std::sync::Arc;

use gdd_core::{GenerateRequest, GenerationSettings, find_section};
use tracing::{info, warn};

use crate::error::AiError;
use crate::model_registry::{ModelRegistry, OpenedStream};
use crate::prompt::{
    ContextPolicy, GenerationPromptParams, build_generation_prompt, generation_system_prompt,
    validate_generation_context,
};
use crate::providers::CompletionRequest;

/// Turns a [`GenerateRequest`] into a provider text stream.
///
/// Nothing is persisted here; the caller decides what to keep.
pub struct GenerationService {
    registry: Arc<ModelRegistry>,
    settings: GenerationSettings,
}

impl GenerationService {
    pub fn new(registry: Arc<ModelRegistry>, settings: GenerationSettings) -> Self {
        Self { registry, settings }
    }

    pub async fn generate(&self, request: &GenerateRequest) -> Result<OpenedStream, AiError> {
        let section = find_section(&request.section_type).ok_or_else(|| {
            AiError::NotFound(format!("Unknown section '{}'", request.section_type))
        })?;
        let sub_section = section.sub_section(&request.sub_section_type).ok_or_else(|| {
            AiError::NotFound(format!(
                "Unknown subsection '{}' in section '{}'",
                request.sub_section_type, request.section_type
            ))
        })?;

        let validation = validate_generation_context(
            &request.game_context,
            &request.all_content,
            &ContextPolicy::from_settings(&self.settings),
        );
        if let Some(message) = validation.error {
            return Err(AiError::InsufficientContext {
                message,
                filled_count: validation.filled_count,
                has_game_info: validation.has_game_info,
            });
        }

        let prompt = build_generation_prompt(&GenerationPromptParams {
            section,
            sub_section,
            game: &request.game_context,
            all_content: &request.all_content,
            context_chars_per_field: self.settings.context_chars_per_field,
        })?;

        let completion = CompletionRequest {
            system: generation_system_prompt(section.slug),
            prompt,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let prompt_chars = completion.prompt.chars().count();

        let opened = self
            .registry
            .open_stream(request.model_id.as_deref(), completion)
            .await
            .inspect_err(|e| {
                warn!(
                    section = section.slug,
                    sub_section = sub_section.id,
                    model_id = e.model_id().or(request.model_id.as_deref()).unwrap_or("default"),
                    "Subsection generation failed: {}",
                    e
                );
            })?;

        info!(
            section = section.slug,
            sub_section = sub_section.id,
            model_id = %opened.model_id,
            prompt_chars,
            filled_count = validation.filled_count,
            "Streaming subsection generation"
        );
        Ok(opened)
    }
}
