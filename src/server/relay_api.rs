//! HTTP API of the relay:
//! - GET /         landing page, or a JSON status when no page is installed
//! - GET /static/* static assets
//! - POST /chat    streamed answer to a prompt
//! - GET /health
//! - GET /metrics

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{Config, ErrorMode};
use crate::metrics::Metrics;
use crate::relay::{open_relay, relay, SharedProvider};
use crate::server::streaming::text_stream_response;

/// Application state shared across handlers.
pub struct AppState {
    pub provider: SharedProvider,
    pub config: Arc<Config>,
    pub metrics: Metrics,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(provider: SharedProvider, config: Arc<Config>, metrics: Metrics) -> Self {
        Self {
            provider,
            config,
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let permissive_cors = state.config.server.permissive_cors;

    let router = Router::new()
        .route("/", get(home))
        // Prompts have no length limit.
        .route("/chat", post(chat).layer(DefaultBodyLimit::disable()))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// JSON body form of a chat request.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Query-string form of a chat request.
#[derive(Debug, Default, Deserialize)]
pub struct PromptParams {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub model: String,
    pub configured: bool,
    pub uptime_secs: u64,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn home(State(state): State<Arc<AppState>>) -> Response {
    let index = state.config.server.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(page) => Html(page).into_response(),
        Err(_) => Json(StatusResponse {
            status: format!("Prompt relay is running ({})", state.provider.name()),
        })
        .into_response(),
    }
}

/// The query parameter wins over a JSON body.
fn extract_prompt(params: PromptParams, body: &[u8]) -> Option<String> {
    params.prompt.or_else(|| {
        serde_json::from_slice::<PromptRequest>(body)
            .ok()
            .map(|req| req.prompt)
    })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PromptParams>,
    body: Bytes,
) -> Response {
    let Some(prompt) = extract_prompt(params, &body) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Missing required parameter: prompt",
        )
            .into_response();
    };

    let request_id = Uuid::new_v4().to_string();
    state.metrics.requests.inc();

    info!(
        request_id = request_id,
        provider = state.provider.name(),
        model = state.provider.model(),
        prompt_chars = prompt.chars().count(),
        "Chat request"
    );

    let fragments = match state.config.server.error_mode {
        ErrorMode::InBand => relay(state.provider.clone(), prompt),
        ErrorMode::Status => match open_relay(state.provider.as_ref(), &prompt).await {
            Ok(fragments) => fragments,
            Err(e) => {
                error!(request_id = request_id, kind = e.kind(), error = %e, "Relay failed before streaming");
                state.metrics.record_error(&e);
                return (e.status_code(), e.to_string()).into_response();
            }
        },
    };

    text_stream_response(fragments, request_id, state.metrics.clone())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let configured = state.provider.is_configured();
    Json(HealthResponse {
        status: if configured { "ok" } else { "unconfigured" }.to_string(),
        provider: state.provider.name().to_string(),
        model: state.provider.model().to_string(),
        configured,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => text.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
