//! Axum router wiring (HTTP -> WS upgrade, liveness).

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ws", get(transport::ws::ws_upgrade))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry().stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "connections": stats.connections,
                "participants": stats.participants,
                "rooms": stats.rooms.len(),
                "droppedFrames": stats.dropped_frames,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "healthz: registry unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
