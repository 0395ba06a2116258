//! `/api/v1/categories` handlers.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum_extra::extract::WithRejection;
use fooderama_core::menu::categories;
use fooderama_core::models::menu::Category;
use fooderama_core::tx;
use fooderama_core::validation::menu as schema;

use super::{JsonBody, parse_id};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::DeletedRowsResponse;

/// `GET /api/v1/categories`, optionally filtered by `restId`.
pub async fn list_categories_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Category>>> {
    let rest_id = match params.get("restId") {
        Some(raw) => Some(parse_id(raw)?),
        None => None,
    };
    let mut conn = state.pool.acquire().await?;
    Ok(Json(categories::list(&mut conn, rest_id).await?))
}

pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id)?;
    let mut conn = state.pool.acquire().await?;
    categories::find(&mut conn, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Category with id {id} not found")))
}

/// `POST /api/v1/categories` (admin). Dishes are created with the category.
pub async fn create_category_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Category>> {
    if body.is_array() {
        return Err(AppError::validation_message("Request body should be an object"));
    }
    let new = schema::category_create(&body)
        .map_err(|e| AppError::validation("Validation error during creation of categories", e))?;
    let mut tx = tx::begin(&state.pool).await?;
    let result = categories::create(&mut tx, &new).await.map_err(AppError::from);
    Ok(Json(tx::settle(tx, result).await?))
}

pub async fn update_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id)?;
    let patch = schema::category_patch(&body)
        .map_err(|e| AppError::validation("Validation error during category update", e))?;
    let mut tx = tx::begin(&state.pool).await?;
    let result = categories::update(&mut tx, id, &patch)
        .await
        .map_err(AppError::from);
    Ok(Json(tx::settle(tx, result).await?))
}

pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedRowsResponse>> {
    let id = parse_id(&id)?;
    let deleted_rows = categories::delete(&state.pool, id).await?;
    Ok(Json(DeletedRowsResponse { deleted_rows }))
}
