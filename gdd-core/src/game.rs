use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::SECTIONS;
use crate::text::strip_html;

/// Subsection id -> HTML content for one section of one game.
pub type SectionContent = BTreeMap<String, String>;

/// Section slug -> content, for every section with at least one saved field.
pub type AllSectionsContent = BTreeMap<String, SectionContent>;

/// Game metadata used to ground prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameContext {
    pub name: String,
    pub concept: String,
    #[serde(default)]
    pub platforms: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

impl GameContext {
    /// Name and concept are both present.
    pub fn has_required_info(&self) -> bool {
        !self.name.trim().is_empty() && !self.concept.trim().is_empty()
    }

    /// Platforms joined for display, or `None` when none are set.
    pub fn platforms_display(&self) -> Option<String> {
        let platforms: Vec<&str> = self
            .platforms
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if platforms.is_empty() {
            None
        } else {
            Some(platforms.join(", "))
        }
    }

    /// Trimmed timeline, if any.
    pub fn timeline_display(&self) -> Option<&str> {
        self.timeline
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Count catalog-known subsections holding non-empty text.
///
/// Stale keys (ids no longer in the catalog) are ignored.
pub fn count_filled_sub_sections(all_content: &AllSectionsContent) -> usize {
    SECTIONS
        .iter()
        .filter_map(|section| {
            all_content
                .get(section.slug)
                .map(|content| (section, content))
        })
        .map(|(section, content)| {
            section
                .sub_section_ids()
                .filter(|id| {
                    content
                        .get(*id)
                        .is_some_and(|value| !strip_html(value).trim().is_empty())
                })
                .count()
        })
        .sum()
}
