//! Minimal `{{var}}` template rendering for the built-in prompts.

use std::collections::HashMap;

pub type TemplateVars = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template error: {0}")]
    Parse(String),
    #[error("missing template variable: {0}")]
    MissingVar(String),
}

pub fn vars_from_pairs(pairs: &[(&str, &str)]) -> TemplateVars {
    let mut vars = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    vars
}

/// Substitute every `{{name}}` in `template`.
///
/// Values are inserted verbatim and never re-scanned, so user text that
/// contains braces cannot inject placeholders.
pub fn render_template(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let (prefix, after_start) = rest.split_at(start);
        out.push_str(prefix);
        let Some(end) = after_start.find("}}") else {
            return Err(TemplateError::Parse("Unclosed {{ in template".to_string()));
        };
        let var = after_start[2..end].trim();
        if var.is_empty() {
            return Err(TemplateError::Parse("Empty {{}} in template".to_string()));
        }
        let value = vars
            .get(var)
            .ok_or_else(|| TemplateError::MissingVar(var.to_string()))?;
        out.push_str(value);
        rest = &after_start[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}
