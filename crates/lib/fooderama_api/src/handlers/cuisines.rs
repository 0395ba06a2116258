//! `/api/v1/cuisines` handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;
use fooderama_core::menu::cuisines;
use fooderama_core::models::menu::Cuisine;
use fooderama_core::tx;
use fooderama_core::validation::menu as schema;

use super::{JsonBody, parse_id};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::DeletedRowsResponse;

pub async fn list_cuisines_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Cuisine>>> {
    Ok(Json(cuisines::list(&state.pool).await?))
}

pub async fn get_cuisine_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Cuisine>> {
    let id = parse_id(&id)?;
    cuisines::find(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Cuisine with {id} was not found")))
}

pub async fn create_cuisine_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Cuisine>> {
    let new = schema::cuisine(&body)
        .map_err(|e| AppError::validation("Validation error during cuisine creation", e))?;
    let mut tx = tx::begin(&state.pool).await?;
    let result = cuisines::create(&mut tx, &new).await.map_err(AppError::from);
    Ok(Json(tx::settle(tx, result).await?))
}

pub async fn update_cuisine_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Cuisine>> {
    let id = parse_id(&id)?;
    let changes = schema::cuisine(&body)
        .map_err(|e| AppError::validation("Validation error during cuisine update", e))?;
    let mut tx = tx::begin(&state.pool).await?;
    let result = cuisines::update(&mut tx, id, &changes)
        .await
        .map_err(AppError::from);
    Ok(Json(tx::settle(tx, result).await?))
}

pub async fn delete_cuisine_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedRowsResponse>> {
    let id = parse_id(&id)?;
    let deleted_rows = cuisines::delete(&state.pool, id).await?;
    Ok(Json(DeletedRowsResponse { deleted_rows }))
}
