//! Request and response bodies shared by the gateway and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{AllSectionsContent, GameContext, SectionContent};

/// Rewrite style applied by the enhancement endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementAction {
    Enhance,
    Improve,
    Expand,
    Concise,
}

impl EnhancementAction {
    pub const ALL: [EnhancementAction; 4] = [
        EnhancementAction::Enhance,
        EnhancementAction::Improve,
        EnhancementAction::Expand,
        EnhancementAction::Concise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementAction::Enhance => "enhance",
            EnhancementAction::Improve => "improve",
            EnhancementAction::Expand => "expand",
            EnhancementAction::Concise => "concise",
        }
    }
}

impl std::fmt::Display for EnhancementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EnhancementAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enhance" => Ok(EnhancementAction::Enhance),
            "improve" => Ok(EnhancementAction::Improve),
            "expand" => Ok(EnhancementAction::Expand),
            "concise" | "shorten" => Ok(EnhancementAction::Concise),
            _ => Err(format!("Unknown enhancement action: {}", s)),
        }
    }
}

/// Body of `POST /ai/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub section_type: String,
    pub sub_section_type: String,
    pub game_context: GameContext,
    #[serde(default)]
    pub all_content: AllSectionsContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Body of `POST /ai/enhance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub action: EnhancementAction,
    pub text: String,
    pub section_type: String,
    pub game_context: GameContext,
}

/// JSON error body returned for every non-streaming failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_game_info: Option<bool>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
            filled_count: None,
            has_game_info: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Stored content of one section, as returned by `GET /games/{id}/sections/{slug}`.
///
/// A section that was never saved comes back empty with version 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPayload {
    pub content: SectionContent,
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<String>,
}

/// Body of `PUT /games/{id}/sections/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSectionRequest {
    pub content: SectionContent,
    pub editor_user_id: String,
    /// Reject the save when the stored version differs. Absent means last write wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSectionResponse {
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}
