//! Checks that a game has enough design context before generating.

use gdd_core::{AllSectionsContent, GameContext, GenerationSettings, count_filled_sub_sections};
use serde::Serialize;

/// Thresholds for [`validate_generation_context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    pub min_filled_subsections: usize,
}

impl ContextPolicy {
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            min_filled_subsections: settings.min_filled_subsections,
        }
    }
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            min_filled_subsections: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextValidation {
    pub is_valid: bool,
    pub error: Option<String>,
    pub filled_count: usize,
    pub has_game_info: bool,
}

/// Decide whether generation has enough to work with.
///
/// Adding content can only turn an invalid result valid, never the reverse.
pub fn validate_generation_context(
    game: &GameContext,
    all_content: &AllSectionsContent,
    policy: &ContextPolicy,
) -> ContextValidation {
    let has_game_info = game.has_required_info();
    let filled_count = count_filled_sub_sections(all_content);

    let error = if !has_game_info {
        Some("The game needs a name and a concept before content can be generated.".to_string())
    } else if filled_count < policy.min_filled_subsections {
        Some(format!(
            "Fill in at least {} subsection{} of the design document before generating content.",
            policy.min_filled_subsections,
            if policy.min_filled_subsections == 1 { "" } else { "s" }
        ))
    } else {
        None
    };

    ContextValidation {
        is_valid: error.is_none(),
        error,
        filled_count,
        has_game_info,
    }
}
