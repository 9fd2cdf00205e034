//! Static catalog of game design document sections.
//!
//! The catalog is configuration, not user data. Section slugs are the keys of
//! [`crate::AllSectionsContent`] and subsection ids are the keys of each
//! [`crate::SectionContent`].

use serde::Serialize;

/// One subsection (editable field) of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSectionDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub placeholder: &'static str,
    /// Steering text for generation. May be empty.
    pub instructions: &'static str,
}

/// A top-level section of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDefinition {
    pub number: u8,
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub sub_sections: &'static [SubSectionDefinition],
}

impl SectionDefinition {
    /// Look up a subsection by id.
    pub fn sub_section(&self, id: &str) -> Option<&'static SubSectionDefinition> {
        self.sub_sections.iter().find(|sub| sub.id == id)
    }

    /// Subsection ids in declared order.
    pub fn sub_section_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sub_sections.iter().map(|sub| sub.id)
    }
}

const fn sub(
    id: &'static str,
    title: &'static str,
    placeholder: &'static str,
    instructions: &'static str,
) -> SubSectionDefinition {
    SubSectionDefinition {
        id,
        title,
        placeholder,
        instructions,
    }
}

pub static SECTIONS: &[SectionDefinition] = &[
    SectionDefinition {
        number: 1,
        slug: "overview",
        title: "Overview",
        description: "The elevator pitch: what the game is and who it is for.",
        sub_sections: &[
            sub(
                "brief-introduction",
                "Brief Introduction",
                "Describe the game in a few sentences...",
                "Summarize the game's premise, genre and core fantasy in two or three short paragraphs.",
            ),
            sub(
                "target-audience",
                "Target Audience",
                "Who is this game for?",
                "Describe the primary and secondary player groups, their tastes and the games they already play.",
            ),
            sub(
                "unique-selling-points",
                "Unique Selling Points",
                "What makes this game stand out?",
                "List the features that set the game apart from comparable titles.",
            ),
            sub(
                "genre-and-inspirations",
                "Genre and Inspirations",
                "Genre, sub-genre and reference titles...",
                "",
            ),
        ],
    },
    SectionDefinition {
        number: 2,
        slug: "story",
        title: "Story and Setting",
        description: "Narrative, world and characters.",
        sub_sections: &[
            sub(
                "synopsis",
                "Synopsis",
                "Outline the story from beginning to end...",
                "Write a synopsis covering the inciting incident, the main conflict and how the story resolves.",
            ),
            sub(
                "world",
                "World and Setting",
                "Where and when does the game take place?",
                "Describe the setting, its history and the rules that govern it.",
            ),
            sub(
                "characters",
                "Characters",
                "Main characters and their motivations...",
                "Introduce the protagonist, antagonist and key supporting characters with their goals.",
            ),
            sub(
                "narrative-delivery",
                "Narrative Delivery",
                "How is the story told to the player?",
                "",
            ),
        ],
    },
    SectionDefinition {
        number: 3,
        slug: "gameplay",
        title: "Gameplay",
        description: "What the player does, moment to moment and over the whole game.",
        sub_sections: &[
            sub(
                "core-loop",
                "Core Gameplay Loop",
                "Describe the loop the player repeats...",
                "Describe the moment-to-moment loop and how it feeds the longer session loop.",
            ),
            sub(
                "mechanics",
                "Game Mechanics",
                "Key mechanics and systems...",
                "Detail the main mechanics and how they interact. Reference the story where it shapes mechanics.",
            ),
            sub(
                "progression",
                "Progression",
                "How does the player grow over time?",
                "Explain unlocks, upgrades and pacing of new content.",
            ),
            sub(
                "controls",
                "Controls",
                "Control scheme per platform...",
                "Describe the control scheme for each target platform.",
            ),
        ],
    },
    SectionDefinition {
        number: 4,
        slug: "level-design",
        title: "Level Design",
        description: "Structure of the spaces the player moves through.",
        sub_sections: &[
            sub(
                "level-structure",
                "Level Structure",
                "Linear, open world, hub-based...",
                "Describe how levels or areas are organized and connected.",
            ),
            sub(
                "environments",
                "Environments",
                "Key locations and biomes...",
                "",
            ),
            sub(
                "difficulty-curve",
                "Difficulty Curve",
                "How does the challenge ramp up?",
                "Explain how difficulty is introduced and tuned across the game.",
            ),
        ],
    },
    SectionDefinition {
        number: 5,
        slug: "art-and-audio",
        title: "Art and Audio",
        description: "Visual identity and soundscape.",
        sub_sections: &[
            sub(
                "visual-style",
                "Visual Style",
                "Art direction, palette, references...",
                "Describe the art direction, color palette and visual references.",
            ),
            sub(
                "music",
                "Music",
                "Musical direction...",
                "",
            ),
            sub(
                "sound-design",
                "Sound Design",
                "Sound effects and ambience...",
                "",
            ),
        ],
    },
    SectionDefinition {
        number: 6,
        slug: "user-interface",
        title: "User Interface",
        description: "Menus, HUD and accessibility.",
        sub_sections: &[
            sub(
                "hud",
                "HUD",
                "What is on screen during play?",
                "",
            ),
            sub(
                "menus",
                "Menus and Flow",
                "Main menu, pause menu, settings...",
                "Describe the screen flow from launch to gameplay.",
            ),
            sub(
                "accessibility",
                "Accessibility",
                "Options for players with different needs...",
                "List accessibility options for vision, hearing, motor and cognitive needs.",
            ),
        ],
    },
    SectionDefinition {
        number: 7,
        slug: "technical",
        title: "Technical Design",
        description: "Platforms, engine and technical constraints.",
        sub_sections: &[
            sub(
                "platform-requirements",
                "Platform Requirements",
                "Target hardware and performance goals...",
                "Describe the performance targets and constraints for each platform listed in the game info.",
            ),
            sub(
                "engine-and-tools",
                "Engine and Tools",
                "Engine, middleware and pipelines...",
                "",
            ),
            sub(
                "online-features",
                "Online Features",
                "Multiplayer, saves, live services...",
                "",
            ),
        ],
    },
    SectionDefinition {
        number: 8,
        slug: "monetization",
        title: "Business and Monetization",
        description: "How the game reaches players and earns revenue.",
        sub_sections: &[
            sub(
                "business-model",
                "Business Model",
                "Premium, free-to-play, subscription...",
                "Describe the business model and pricing, staying respectful of the target audience.",
            ),
            sub(
                "marketing",
                "Marketing",
                "How will players hear about the game?",
                "",
            ),
        ],
    },
    SectionDefinition {
        number: 9,
        slug: "production",
        title: "Production",
        description: "Team, milestones and risks.",
        sub_sections: &[
            sub(
                "milestones",
                "Milestones",
                "Key milestones and dates...",
                "Propose milestones that fit the timeline given in the game info.",
            ),
            sub(
                "team",
                "Team",
                "Roles and headcount...",
                "",
            ),
            sub(
                "risks",
                "Risks",
                "Main production risks and mitigations...",
                "",
            ),
        ],
    },
];

/// Find a section by slug.
pub fn find_section(slug: &str) -> Option<&'static SectionDefinition> {
    SECTIONS.iter().find(|section| section.slug == slug)
}

/// Resolve a `(section, subsection)` pair against the catalog.
pub fn resolve_sub_section(
    section_slug: &str,
    sub_section_id: &str,
) -> Option<(&'static SectionDefinition, &'static SubSectionDefinition)> {
    let section = find_section(section_slug)?;
    let sub = section.sub_section(sub_section_id)?;
    Some((section, sub))
}
