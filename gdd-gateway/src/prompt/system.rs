//! System prompts per section type.

const GENERATION_PREAMBLE: &str = include_str!("../../prompts/generation-system.md");
const ENHANCEMENT_RULES: &str = include_str!("../../prompts/enhancement-rules.md");

const OVERVIEW: &str = "You are a seasoned game director. You explain what a game is, who it is for and why it will stand out, in language a publisher can read in two minutes.";
const STORY: &str = "You are a narrative designer. You build worlds, characters and plots that serve the gameplay, and you keep tone and lore consistent.";
const GAMEPLAY: &str = "You are a systems game designer. You describe mechanics precisely: player verbs, rules, feedback loops, progression and failure states.";
const LEVEL_DESIGN: &str = "You are a level designer. You think in spaces, pacing, difficulty curves and how each area teaches or tests the player.";
const ART_AND_AUDIO: &str = "You are an art and audio director. You define a coherent visual and sonic identity with concrete references, palettes and moods.";
const USER_INTERFACE: &str = "You are a UX and UI designer for games. You describe screens, HUD elements, input schemes and accessibility with the player's attention in mind.";
const TECHNICAL: &str = "You are a technical director for game production. You choose engines, tools and architectures with realistic constraints on team size and target platforms.";
const MONETIZATION: &str = "You are a game business designer. You propose fair monetization and retention strategies that fit the audience and never undermine the core experience.";
const PRODUCTION: &str = "You are a game producer. You plan milestones, team composition, budgets and risks so that the project can actually ship.";

/// Persona for a section, falling back to the overview persona for unknown slugs.
pub fn section_system_prompt(section_type: &str) -> &'static str {
    match section_type {
        "overview" => OVERVIEW,
        "story" => STORY,
        "gameplay" => GAMEPLAY,
        "level-design" => LEVEL_DESIGN,
        "art-and-audio" => ART_AND_AUDIO,
        "user-interface" => USER_INTERFACE,
        "technical" => TECHNICAL,
        "monetization" => MONETIZATION,
        "production" => PRODUCTION,
        _ => OVERVIEW,
    }
}

/// System prompt for subsection generation (HTML output).
pub fn generation_system_prompt(section_type: &str) -> String {
    format!(
        "{}\n\n{}",
        section_system_prompt(section_type),
        GENERATION_PREAMBLE.trim_end()
    )
}

/// System prompt for rewriting existing text (plain paragraphs).
pub fn enhancement_system_prompt(section_type: &str) -> String {
    format!(
        "{}\n\n{}",
        section_system_prompt(section_type),
        ENHANCEMENT_RULES.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdd_core::SECTIONS;

    #[test]
    fn test_every_catalog_section_has_its_own_prompt() {
        for section in SECTIONS.iter().filter(|s| s.slug != "overview") {
            assert_ne!(
                section_system_prompt(section.slug),
                OVERVIEW,
                "{} falls back to overview",
                section.slug
            );
        }
    }

    #[test]
    fn test_unknown_section_falls_back_to_overview() {
        assert_eq!(section_system_prompt("marketing"), OVERVIEW);
        assert_eq!(section_system_prompt(""), OVERVIEW);
    }

    #[test]
    fn test_composed_prompts() {
        let generation = generation_system_prompt("story");
        assert!(generation.starts_with(STORY));
        assert!(generation.contains("HTML"));

        let enhancement = enhancement_system_prompt("nope");
        assert!(enhancement.starts_with(OVERVIEW));
        assert!(enhancement.contains("blank line"));
    }
}
