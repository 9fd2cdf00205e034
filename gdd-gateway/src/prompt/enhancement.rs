//! Prompt for rewriting existing section text.

use gdd_core::{EnhancementAction, GameContext};

use super::template::{TemplateError, render_template, vars_from_pairs};

const ENHANCEMENT_TEMPLATE: &str = include_str!("../../prompts/enhancement.md");

/// Instruction given to the model for each action.
pub fn action_instruction(action: EnhancementAction) -> &'static str {
    match action {
        EnhancementAction::Enhance => {
            "Enhance the text below: make it more vivid, specific and engaging while keeping its meaning and length roughly the same."
        }
        EnhancementAction::Improve => {
            "Improve the text below: fix grammar, clarity and flow, and tighten vague statements. Do not change its substance."
        }
        EnhancementAction::Expand => {
            "Expand the text below: add concrete detail, examples and implications for the design, roughly doubling its length."
        }
        EnhancementAction::Concise => {
            "Make the text below more concise: keep every important point but cut repetition and filler, aiming for about half the length."
        }
    }
}

/// Build the user prompt for rewriting `text`.
///
/// The text is inserted literally between delimiters.
pub fn build_enhancement_prompt(
    action: EnhancementAction,
    text: &str,
    game: &GameContext,
) -> Result<String, TemplateError> {
    let vars = vars_from_pairs(&[
        ("instruction", action_instruction(action)),
        ("game_name", game.name.trim()),
        ("concept", game.concept.trim()),
        ("text", text.trim()),
    ]);
    render_template(ENHANCEMENT_TEMPLATE, &vars)
}
