//! HTTP API consumed by the graph editor.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::emit::EmitOutput;
use crate::error::Error;
use crate::pipeline::{CompileRequest, Pipeline};

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Create a sanitized error response for external consumers.
///
/// The full error is logged; clients only see the external message.
fn external_error_response(e: Error) -> Response {
    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("API error: {:?}", e);
    } else {
        warn!("Rejected request: {}", e);
    }
    (status, Json(e.to_json())).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": message.into()})),
    )
        .into_response()
}

/// Create CORS layer based on environment configuration.
///
/// - VMFLOW_CORS_ORIGINS: Comma-separated list of allowed origins (default: http://localhost:3000)
pub fn create_cors_layer() -> CorsLayer {
    let origins_str = std::env::var("VMFLOW_CORS_ORIGINS").ok();
    cors_layer_for(origins_str.as_deref().unwrap_or(DEFAULT_CORS_ORIGIN))
}

fn parse_origins(origins: &str) -> Vec<HeaderValue> {
    origins
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(hv) => Some(hv),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

fn cors_layer_for(origins: &str) -> CorsLayer {
    let mut parsed = parse_origins(origins);
    if parsed.is_empty() {
        warn!("No valid CORS origins configured, using {}", DEFAULT_CORS_ORIGIN);
        parsed.push(HeaderValue::from_static(DEFAULT_CORS_ORIGIN));
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 100;

/// - VMFLOW_MAX_CONCURRENT_REQUESTS: Maximum concurrent requests (default: 100)
pub fn get_max_concurrent_requests() -> usize {
    std::env::var("VMFLOW_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS)
}

/// Create a concurrency limit layer to prevent resource exhaustion.
pub fn create_concurrency_limit() -> tower::limit::ConcurrencyLimitLayer {
    tower::limit::ConcurrencyLimitLayer::new(get_max_concurrent_requests())
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Create the API router (without state applied - call with_state on the result).
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/templates", get(list_templates))
        .route("/api/templates/details", get(template_details))
        .route("/api/workflows/submit", post(submit_workflow))
}

/// Create the complete API router with state.
pub fn create_router(state: AppState) -> Router {
    create_api_routes()
        .layer(create_concurrency_limit())
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state)
}

// ============================================================================
// Health Check
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ============================================================================
// Template Endpoints
// ============================================================================

async fn list_templates(State(state): State<AppState>) -> Response {
    match state.pipeline.template_summaries().await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => external_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct DetailsQuery {
    name: Option<String>,
    entrypoint: Option<String>,
}

async fn template_details(
    State(state): State<AppState>,
    Query(query): Query<DetailsQuery>,
) -> Response {
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let (Some(name), Some(entrypoint)) = (present(query.name), present(query.entrypoint)) else {
        return bad_request("Both 'name' and 'entrypoint' query parameters are required");
    };

    match state.pipeline.template_spec(&name, &entrypoint).await {
        Ok(spec) => Json(spec).into_response(),
        Err(e @ Error::EntrypointNotFound { .. }) => {
            warn!("{}", e);
            (StatusCode::NOT_FOUND, Json(e.to_json())).into_response()
        }
        Err(e) => {
            error!("Failed to load template details: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(e.to_json())).into_response()
        }
    }
}

// ============================================================================
// Workflow Endpoints
// ============================================================================

async fn submit_workflow(
    State(state): State<AppState>,
    body: Result<Json<CompileRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    if request.graph.nodes.is_empty() {
        return bad_request("No nodes provided");
    }

    match state.pipeline.run(&request).await {
        Ok(EmitOutput::Definition(yaml)) => {
            Json(json!({"status": "success", "yaml": yaml})).into_response()
        }
        Ok(EmitOutput::Submitted(workflow_name)) => {
            info!(workflow = %workflow_name, "workflow submitted");
            Json(json!({
                "status": "submitted",
                "workflow_name": workflow_name,
                "message": format!("Workflow {} submitted to cluster.", workflow_name),
            }))
            .into_response()
        }
        Err(e) => external_error_response(e),
    }
}
