//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Catalog + direct resolution
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/domains", get(http::http_get_domains))
        .route("/api/v1/mission", get(http::http_get_mission))
        // Sessions
        .route("/api/v1/sessions", post(http::http_create_session))
        .route("/api/v1/sessions/:id", get(http::http_get_session))
        .route("/api/v1/sessions/:id/select", post(http::http_post_select))
        .route("/api/v1/sessions/:id/mission", post(http::http_post_start_mission))
        .route("/api/v1/sessions/:id/map", post(http::http_post_open_map))
        .route("/api/v1/sessions/:id/module/enter", post(http::http_post_enter_module))
        .route("/api/v1/sessions/:id/module/start", post(http::http_post_start_questions))
        .route("/api/v1/sessions/:id/module/advance", post(http::http_post_advance_module))
        .route("/api/v1/sessions/:id/answer", post(http::http_post_answer))
        .route("/api/v1/sessions/:id/reset", post(http::http_post_reset))
        // Feedback + analytics
        .route("/api/v1/feedback", post(http::http_post_feedback))
        .route(
            "/api/v1/analytics",
            get(http::http_get_analytics).delete(http::http_delete_analytics),
        )
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
