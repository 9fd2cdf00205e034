//! Plain-text helpers for HTML field content.

use std::sync::OnceLock;

use regex::Regex;

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static tag regex"))
}

fn block_break_regex() -> &'static Regex {
    static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    BLOCK_RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|ul|ol|blockquote)>")
            .expect("static block regex")
    })
}

fn paragraph_break_regex() -> &'static Regex {
    static PARA_RE: OnceLock<Regex> = OnceLock::new();
    PARA_RE.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("static paragraph regex"))
}

fn blank_lines_regex() -> &'static Regex {
    static BLANK_RE: OnceLock<Regex> = OnceLock::new();
    BLANK_RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static blank-lines regex"))
}

/// Convert editor HTML to readable plain text.
///
/// Block-level closing tags and `<br>` become newlines; every other tag is
/// dropped and the common entities are decoded.
pub fn strip_html(html: &str) -> String {
    let with_breaks = block_break_regex().replace_all(html, "\n");
    let without_tags = tag_regex().replace_all(&with_breaks, "");
    let decoded = decode_entities(&without_tags);
    let lines: Vec<&str> = decoded.lines().map(str::trim_end).collect();
    blank_lines_regex()
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escape text for insertion into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Split text into paragraphs separated by blank lines.
///
/// Paragraphs are trimmed and empty ones are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    paragraph_break_regex()
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Wrap a plain paragraph as HTML. Paragraphs that already look like markup are kept.
pub fn paragraph_to_html(paragraph: &str) -> String {
    let trimmed = paragraph.trim();
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return trimmed.to_string();
    }
    let lines: Vec<String> = trimmed.lines().map(|l| escape_html(l.trim())).collect();
    format!("<p>{}</p>", lines.join("<br>"))
}

/// Truncate to at most `max_chars` characters on a char boundary, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}
