use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

use super::query::ListParams;
use crate::db::extrinsic_repo;
use crate::errors::AppError;
use crate::models::ExtrinsicRecord;
use crate::AppState;

pub async fn count(State(state): State<AppState>) -> Result<Json<i64>, AppError> {
    let count = extrinsic_repo::count_extrinsics(&state.db).await?;
    Ok(Json(count))
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ExtrinsicRecord>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let window = params.window(Utc::now())?;
    let limit = params.limit()?;

    let extrinsics = extrinsic_repo::list_extrinsics(&state.db, window, limit).await?;
    Ok(Json(extrinsics))
}
