//! Prompt construction for generation and enhancement.
//!
//! Prompts are pure functions of their inputs. Templates live in
//! `prompts/*.md` and are compiled into the binary.

pub mod context;
pub mod enhancement;
pub mod generation;
pub mod system;
pub mod template;

pub use context::{ContextPolicy, ContextValidation, validate_generation_context};
pub use enhancement::{action_instruction, build_enhancement_prompt};
pub use generation::{GenerationPromptParams, build_generation_prompt};
pub use system::{enhancement_system_prompt, generation_system_prompt, section_system_prompt};
pub use template::{TemplateError, TemplateVars, render_template, vars_from_pairs};
