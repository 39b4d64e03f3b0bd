//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Body of the liveness endpoint
pub const LIVENESS_TEXT: &str = "Multiplayer server is running!";

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(liveness_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS layer for the configured origin list ("*" allows any origin)
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    // Support multiple origins (comma-separated)
    let allowed_origins: Vec<HeaderValue> = origin
        .split(',')
        .filter_map(|s| match s.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %s, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Liveness / health endpoints
// ============================================================================

async fn liveness_handler() -> &'static str {
    LIVENESS_TEXT
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connected_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connected_players: state.registry.len(),
    })
}
