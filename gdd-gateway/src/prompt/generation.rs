//! Prompt for generating one subsection from the rest of the document.

use std::fmt::Write as _;

use gdd_core::text::{strip_html, truncate_chars};
use gdd_core::{AllSectionsContent, GameContext, SECTIONS, SectionDefinition, SubSectionDefinition};

use super::template::{TemplateError, render_template, vars_from_pairs};

const GENERATION_TEMPLATE: &str = include_str!("../../prompts/generation.md");

const NOT_SPECIFIED: &str = "Not specified";

/// Inputs of [`build_generation_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct GenerationPromptParams<'a> {
    pub section: &'static SectionDefinition,
    pub sub_section: &'static SubSectionDefinition,
    pub game: &'a GameContext,
    pub all_content: &'a AllSectionsContent,
    /// Plain-text budget for each embedded subsection
    pub context_chars_per_field: usize,
}

/// Build the user prompt for generating `params.sub_section`.
///
/// The output only depends on the inputs: sections are walked in catalog
/// order and unknown keys in `all_content` are ignored.
pub fn build_generation_prompt(params: &GenerationPromptParams<'_>) -> Result<String, TemplateError> {
    let game = params.game;
    let platforms = game
        .platforms_display()
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let timeline = game.timeline_display().unwrap_or(NOT_SPECIFIED);

    let instructions = if params.sub_section.instructions.trim().is_empty() {
        format!("Cover the following: {}", params.sub_section.placeholder)
    } else {
        params.sub_section.instructions.trim().to_string()
    };

    let current_draft = params
        .all_content
        .get(params.section.slug)
        .and_then(|content| content.get(params.sub_section.id))
        .map(|html| strip_html(html))
        .filter(|text| !text.trim().is_empty())
        .map(|text| truncate_chars(&text, params.context_chars_per_field))
        .unwrap_or_else(|| "(empty)".to_string());

    let existing_content = existing_content_block(params);

    let vars = vars_from_pairs(&[
        ("game_name", game.name.trim()),
        ("concept", game.concept.trim()),
        ("platforms", platforms.as_str()),
        ("timeline", timeline),
        ("section_title", params.section.title),
        ("sub_section_title", params.sub_section.title),
        ("instructions", instructions.as_str()),
        ("current_draft", current_draft.as_str()),
        ("existing_content", existing_content.as_str()),
    ]);
    render_template(GENERATION_TEMPLATE, &vars)
}

fn existing_content_block(params: &GenerationPromptParams<'_>) -> String {
    let mut block = String::new();

    for section in SECTIONS {
        let Some(content) = params.all_content.get(section.slug) else {
            continue;
        };
        for sub in section.sub_sections {
            if section.slug == params.section.slug && sub.id == params.sub_section.id {
                continue;
            }
            let Some(html) = content.get(sub.id) else {
                continue;
            };
            let text = strip_html(html);
            if text.trim().is_empty() {
                continue;
            }
            let _ = write!(
                block,
                "## {} / {}\n{}\n\n",
                section.title,
                sub.title,
                truncate_chars(&text, params.context_chars_per_field)
            );
        }
    }

    if block.is_empty() {
        "No other subsections are filled in yet.".to_string()
    } else {
        block.trim_end().to_string()
    }
}
