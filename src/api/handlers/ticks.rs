use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

use super::query::ListParams;
use crate::db::tick_repo;
use crate::errors::AppError;
use crate::models::Tick;
use crate::AppState;

pub async fn count(State(state): State<AppState>) -> Result<Json<i64>, AppError> {
    let count = tick_repo::count_ticks(&state.db).await?;
    Ok(Json(count))
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Tick>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let window = params.window(Utc::now())?;
    let limit = params.limit()?;

    let ticks = tick_repo::list_ticks(&state.db, window, limit).await?;
    Ok(Json(ticks))
}
