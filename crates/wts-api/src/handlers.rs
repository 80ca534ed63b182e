//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/turn` | Current turn |
//! | `GET` | `/api/turn/frozen` | Snapshot taken at game creation |
//! | `POST` | `/api/turn/advance` | Guarded single-phase advance |
//! | `POST` | `/api/control` | Navigation and pause/play |
//! | `POST` | `/api/defcon` | Change one nation's DEFCON level |
//! | `POST` | `/api/news` | Append breaking news |
//!
//! Control and DEFCON commands answer `409 Conflict` with
//! `"Failed to get lock"` when another client changed the turn first.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use wts_core::clock::to_api_response;
use wts_types::{AdvanceRequest, ApiResponse, ControlCommand, DefconUpdate, NewsSubmission};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report that the server is up. Does not touch the store.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Return the current turn, creating it on first access.
pub async fn get_turn(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let turn = state.store.get_current_turn().await?;
    Ok(Json(to_api_response(&turn, false)))
}

/// Return the snapshot captured when the turn record was created.
pub async fn get_frozen_turn(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse>, ApiError> {
    let turn = state.store.get_current_turn().await?;
    turn.frozen_turn
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no frozen turn recorded".to_owned()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Apply a navigation or pause/play action.
pub async fn control(
    State(state): State<Arc<AppState>>,
    Json(command): Json<ControlCommand>,
) -> Result<Json<ApiResponse>, ApiError> {
    let turn = state.executor.apply(command.action).await?.into_result()?;
    Ok(Json(to_api_response(&turn, false)))
}

/// Change one nation's DEFCON level.
pub async fn update_defcon(
    State(state): State<Arc<AppState>>,
    Json(update): Json<DefconUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let turn = state
        .executor
        .update_defcon_status(update.state_name, update.new_status)
        .await?
        .into_result()?;
    Ok(Json(to_api_response(&turn, false)))
}

/// Append a breaking-news item stamped with the current turn and phase.
pub async fn post_news(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<NewsSubmission>,
) -> Result<Json<ApiResponse>, ApiError> {
    let turn = state.news.append_news(submission.breaking_news).await?;
    Ok(Json(to_api_response(&turn, false)))
}

/// Advance one phase if the clock is still at the version the client saw.
///
/// Always answers with the turn as it now stands, whether this request
/// moved it or another one already had.
pub async fn advance_turn(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let turn = state.executor.advance_if_current(request.into()).await?;
    Ok(Json(to_api_response(&turn, false)))
}
