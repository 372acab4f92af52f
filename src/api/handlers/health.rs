use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::db::tick_repo;
use crate::AppState;

/// Database reachability plus the newest ingested block, so a stalled
/// ingester is visible as a growing `lag_seconds`.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match tick_repo::latest_tick(&state.db).await {
        Ok(Some(tick)) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "latest_block": tick.block_number,
                "latest_tick_at": tick.timestamp,
                "lag_seconds": (Utc::now() - tick.timestamp).num_seconds(),
            })),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "latest_block": null,
                "latest_tick_at": null,
                "lag_seconds": null,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check query failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "db": "disconnected" })),
            )
        }
    }
}
