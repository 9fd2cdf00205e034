//! Editor commands typed at the prompt.

use gdd_core::EnhancementAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Show,
    Sections,
    Models,
    Status,
    Edit { sub_section: String, text: String },
    Generate { sub_section: String, model_id: Option<String> },
    Accept { sub_section: String },
    Enhance(EnhancementAction),
    Apply,
    Save,
    Overwrite,
    Reload,
    Switch(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}' (type 'help')")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    InvalidAction(String),
}

pub const HELP: &str = "\
Commands:
  show                      Print the current section
  sections                  List the document sections
  models                    List AI models and their availability
  status                    Show save state and version
  edit <sub> <text>         Replace a subsection with plain text
  gen <sub> [model]         Stream an AI draft for a subsection
  accept <sub>              Put the last draft into a subsection
  enhance <action>          Rewrite the section (enhance, improve, expand, concise)
  apply                     Replace the section with the last rewrite
  save                      Save now
  overwrite                 Save over changes made elsewhere
  reload                    Drop local edits and load the stored section
  switch <section>          Open another section
  quit                      Save and exit
Ctrl-C stops a running AI stream.";

impl Command {
    /// Parse one input line. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let Some((name, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match name.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "show" => Command::Show,
            "sections" => Command::Sections,
            "models" => Command::Models,
            "status" => Command::Status,
            "apply" => Command::Apply,
            "save" => Command::Save,
            "overwrite" => Command::Overwrite,
            "reload" => Command::Reload,
            "quit" | "exit" => Command::Quit,
            "edit" => {
                let (sub_section, text) =
                    split_word(rest).ok_or(CommandError::Usage("edit <sub> <text>"))?;
                if text.is_empty() {
                    return Err(CommandError::Usage("edit <sub> <text>"));
                }
                Command::Edit {
                    sub_section: sub_section.to_string(),
                    text: text.to_string(),
                }
            }
            "gen" | "generate" => {
                let (sub_section, model) =
                    split_word(rest).ok_or(CommandError::Usage("gen <sub> [model]"))?;
                Command::Generate {
                    sub_section: sub_section.to_string(),
                    model_id: (!model.is_empty()).then(|| model.to_string()),
                }
            }
            "accept" => {
                let (sub_section, _) =
                    split_word(rest).ok_or(CommandError::Usage("accept <sub>"))?;
                Command::Accept {
                    sub_section: sub_section.to_string(),
                }
            }
            "enhance" => {
                let (action, _) =
                    split_word(rest).ok_or(CommandError::Usage("enhance <action>"))?;
                Command::Enhance(action.parse().map_err(CommandError::InvalidAction)?)
            }
            "switch" => {
                let (slug, _) = split_word(rest).ok_or(CommandError::Usage("switch <section>"))?;
                Command::Switch(slug.to_string())
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// First word and the trimmed remainder.
fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    })
}
