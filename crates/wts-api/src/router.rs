//! Axum router construction for the HTTP API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for the browser client and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /api/turn` -- current turn
/// - `GET /api/turn/frozen` -- snapshot taken when the game was created
/// - `POST /api/turn/advance` -- advance one phase if still at a version
/// - `POST /api/control` -- clock navigation and pause/play
/// - `POST /api/defcon` -- change one nation's alert level
/// - `POST /api/news` -- append breaking news
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Reads
        .route("/api/turn", get(handlers::get_turn))
        .route("/api/turn/frozen", get(handlers::get_frozen_turn))
        // Commands
        .route("/api/turn/advance", post(handlers::advance_turn))
        .route("/api/control", post(handlers::control))
        .route("/api/defcon", post(handlers::update_defcon))
        .route("/api/news", post(handlers::post_news))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
