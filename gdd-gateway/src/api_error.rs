//! Mapping of service errors to HTTP responses.
//!
//! Provider and storage details are logged here and never sent to clients.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gdd_core::ErrorBody;
use gdd_db::DbError;
use tracing::{error, warn};

use crate::error::AiError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    UnknownModel(String),
    NotFound(String),
    Conflict { expected: i64, actual: i64 },
    InsufficientContext {
        message: String,
        filled_count: usize,
        has_game_info: bool,
    },
    Provider,
    Persistence,
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InsufficientContext { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Provider => StatusCode::BAD_GATEWAY,
            ApiError::Persistence | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorBody {
        match self {
            ApiError::Validation(message) => ErrorBody::new(message, "VALIDATION_ERROR"),
            ApiError::UnknownModel(id) => {
                ErrorBody::new(format!("Unknown model: {id}"), "UNKNOWN_MODEL")
            }
            ApiError::NotFound(message) => ErrorBody::new(message, "NOT_FOUND"),
            ApiError::Conflict { expected, actual } => ErrorBody::new(
                format!(
                    "Section was changed by someone else (expected version {expected}, found {actual}). Reload or overwrite."
                ),
                "CONFLICT",
            ),
            ApiError::InsufficientContext {
                message,
                filled_count,
                has_game_info,
            } => ErrorBody {
                filled_count: Some(filled_count),
                has_game_info: Some(has_game_info),
                ..ErrorBody::new(message, "INSUFFICIENT_CONTEXT")
            },
            ApiError::Provider => ErrorBody::new(
                "The AI provider could not complete the request. Try again or pick another model.",
                "PROVIDER_ERROR",
            ),
            ApiError::Persistence => {
                ErrorBody::new("Failed to access saved content", "PERSISTENCE_ERROR")
            }
            ApiError::Internal => ErrorBody::new("Internal error", "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Validation(message) => ApiError::Validation(message),
            AiError::NotFound(message) => ApiError::NotFound(message),
            AiError::InsufficientContext {
                message,
                filled_count,
                has_game_info,
            } => ApiError::InsufficientContext {
                message,
                filled_count,
                has_game_info,
            },
            AiError::UnknownModel(id) => ApiError::UnknownModel(id),
            AiError::Provider { model_id, source } => {
                warn!(model_id = %model_id, status = source.status(), "Provider error: {}", source);
                ApiError::Provider
            }
            AiError::Template(e) => {
                error!("Prompt template failed to render: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::VersionConflict { expected, actual } => ApiError::Conflict { expected, actual },
            other => {
                error!("Section storage error: {}", other);
                ApiError::Persistence
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
