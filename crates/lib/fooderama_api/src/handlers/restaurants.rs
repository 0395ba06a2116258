//! `/api/v1/restaurants` handlers.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::WithRejection;
use fooderama_core::menu::restaurants::{self, Includes, ListOptions};
use fooderama_core::models::menu::Restaurant;
use fooderama_core::tx;
use fooderama_core::validation::menu::{self as schema, RestaurantCreate};

use super::{JsonBody, parse_id};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::DeletedRowsResponse;

fn not_found(id: i32) -> AppError {
    AppError::not_found(format!("Restaurant with id {id} not found"))
}

/// `GET /api/v1/restaurants`
pub async fn list_restaurants_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Restaurant>>> {
    let options = ListOptions::from_query(&params);
    let mut conn = state.pool.acquire().await?;
    Ok(Json(restaurants::list(&mut conn, options).await?))
}

/// `GET /api/v1/restaurants/{id}`
pub async fn get_restaurant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Restaurant>> {
    let id = parse_id(&id)?;
    let mut conn = state.pool.acquire().await?;
    restaurants::find(&mut conn, id, Includes::from_query(&params))
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// `POST /api/v1/restaurants` (admin).
///
/// An object creates one restaurant, optionally with `Cuisines`; an array
/// bulk-creates restaurants without associations.
pub async fn create_restaurants_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Response> {
    let request = schema::restaurant_create(&body)
        .map_err(|e| AppError::validation("Validation error during restaurant creation", e))?;
    let default_image = state.config.default_restaurant_image.as_str();

    let mut tx = tx::begin(&state.pool).await?;
    let response = match request {
        RestaurantCreate::Single {
            restaurant,
            cuisine_ids,
        } => {
            let result =
                restaurants::create(&mut tx, &restaurant, cuisine_ids.as_deref(), default_image)
                    .await
                    .map_err(AppError::from);
            Json(tx::settle(tx, result).await?).into_response()
        }
        RestaurantCreate::Bulk(items) => {
            let result = restaurants::create_many(&mut tx, &items, default_image)
                .await
                .map_err(AppError::from);
            Json(tx::settle(tx, result).await?).into_response()
        }
    };
    Ok(response)
}

/// `PUT /api/v1/restaurants/{id}` (admin).
pub async fn update_restaurant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Restaurant>> {
    let id = parse_id(&id)?;
    let patch = schema::restaurant_patch(&body)
        .map_err(|e| AppError::validation("Validation error during restaurant update", e))?;

    let mut tx = tx::begin(&state.pool).await?;
    let result = restaurants::update(&mut tx, id, &patch)
        .await
        .map_err(AppError::from);
    Ok(Json(tx::settle(tx, result).await?))
}

/// `DELETE /api/v1/restaurants/{id}` (admin).
pub async fn delete_restaurant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedRowsResponse>> {
    let id = parse_id(&id)?;
    let deleted_rows = restaurants::delete_by_id(&state.pool, id).await?;
    Ok(Json(DeletedRowsResponse { deleted_rows }))
}

/// `DELETE /api/v1/restaurants` (admin). The body is the filter.
pub async fn delete_restaurants_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<DeletedRowsResponse>> {
    let filter = schema::restaurant_filter(&body)
        .map_err(|e| AppError::validation("Validation error in delete filter", e))?;
    let deleted_rows = restaurants::delete_where(&state.pool, &filter).await?;
    Ok(Json(DeletedRowsResponse { deleted_rows }))
}
