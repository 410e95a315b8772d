//! Axum router construction for the Geobin API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS, request tracing, a body size limit, and per-route rate
//! limits on the routes that create or read bulk data.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{self, RouteLimit};
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Geobin server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `POST /api/1/create` -- create a bin (rate limited)
/// - `POST /api/1/counts` -- entry counts for a list of bins
/// - `GET|POST /api/1/history/{bin_id}` -- bin history (rate limited)
/// - `GET /api/1/ws/{bin_id}` -- `WebSocket` live feed
/// - `POST /{bin_id}` -- capture a request (rate limited)
///
/// CORS allows any origin: bins receive webhooks from anywhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let limited = |route: &'static str| {
        from_fn_with_state(
            RouteLimit::new(Arc::clone(&state.limiter), route),
            rate_limit::enforce,
        )
    };

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // REST API
        .route(
            "/api/1/create",
            post(handlers::create_bin).layer(limited("create")),
        )
        .route("/api/1/counts", post(handlers::counts))
        .route(
            "/api/1/history/{bin_id}",
            get(handlers::history)
                .post(handlers::history)
                .layer(limited("history")),
        )
        // WebSocket
        .route("/api/1/ws/{bin_id}", get(ws::ws_bin))
        // Capture
        .route("/{bin_id}", post(handlers::ingest).layer(limited("ingest")))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
