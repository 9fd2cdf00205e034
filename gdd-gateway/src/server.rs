//! HTTP API: section catalog, model list, streaming AI endpoints and section storage.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use gdd_core::{
    AllSectionsContent, EnhanceRequest, GenerateRequest, HealthResponse, ModelOption, SECTIONS,
    SaveSectionRequest, SaveSectionResponse, SectionDefinition, SectionPayload, find_section,
};
use gdd_db::SectionContentRepository;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api_error::ApiError;
use crate::model_registry::OpenedStream;
use crate::state::AppState;

/// Header naming the model that serves a streamed response.
pub const MODEL_ID_HEADER: &str = "x-gdd-model";

/// Run the HTTP server
pub async fn run(state: Arc<AppState>, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_allowed_origins);
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/sections", get(sections_handler))
        .route("/ai/models", get(models_handler))
        .route("/ai/generate", post(generate_handler))
        .route("/ai/enhance", post(enhance_handler))
        .route("/games/{game_id}/sections", get(all_sections_handler))
        .route(
            "/games/{game_id}/sections/{slug}",
            get(get_section_handler).put(save_section_handler),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for browser editors. `None` when no origin is configured.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        warn!("CORS allows any origin");
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        info!("CORS configured for origins: {:?}", origins);
        AllowOrigin::list(parsed)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([HeaderName::from_static(MODEL_ID_HEADER)]),
    )
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn sections_handler() -> Json<&'static [SectionDefinition]> {
    Json(SECTIONS)
}

async fn models_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ModelOption>> {
    Json(state.registry.list_models())
}

async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let opened = state.generation.generate(&request).await?;
    Ok(text_stream_response(opened))
}

async fn enhance_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EnhanceRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let opened = state.enhancement.enhance(&request).await?;
    Ok(text_stream_response(opened))
}

/// Stream provider text as it arrives.
///
/// Headers are already sent once the body streams, so a provider failure
/// mid-stream aborts the body instead of turning into a JSON error.
fn text_stream_response(opened: OpenedStream) -> Response {
    let OpenedStream { model_id, stream } = opened;
    let log_model = model_id.clone();
    let body = stream.inspect(move |chunk| {
        if let Err(e) = chunk {
            warn!(model_id = %log_model, "Stream ended with provider error: {}", e);
        }
    });

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (HeaderName::from_static(MODEL_ID_HEADER), model_id),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

fn known_section(slug: &str) -> Result<&'static SectionDefinition, ApiError> {
    find_section(slug).ok_or_else(|| ApiError::NotFound(format!("Unknown section '{slug}'")))
}

async fn all_sections_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<AllSectionsContent>, ApiError> {
    let all = SectionContentRepository::get_all(state.db().pool(), &game_id).await?;
    Ok(Json(all))
}

async fn get_section_handler(
    State(state): State<Arc<AppState>>,
    Path((game_id, slug)): Path<(String, String)>,
) -> Result<Json<SectionPayload>, ApiError> {
    known_section(&slug)?;
    let record = SectionContentRepository::get_record(state.db().pool(), &game_id, &slug).await?;
    let payload = match record {
        Some(record) => SectionPayload {
            content: record.content,
            version: record.version,
            updated_at: Some(record.updated_at),
            last_edited_by: record.last_edited_by,
        },
        None => SectionPayload::default(),
    };
    Ok(Json(payload))
}

async fn save_section_handler(
    State(state): State<Arc<AppState>>,
    Path((game_id, slug)): Path<(String, String)>,
    payload: Result<Json<SaveSectionRequest>, JsonRejection>,
) -> Result<Json<SaveSectionResponse>, ApiError> {
    known_section(&slug)?;
    let Json(request) = payload?;
    if request.editor_user_id.trim().is_empty() {
        return Err(ApiError::Validation("editorUserId must not be empty".to_string()));
    }

    let outcome = SectionContentRepository::save(
        state.db().pool(),
        &game_id,
        &slug,
        &request.content,
        request.editor_user_id.trim(),
        request.expected_version,
    )
    .await?;

    Ok(Json(SaveSectionResponse {
        version: outcome.version,
        updated_at: outcome.updated_at,
    }))
}
