//! Request handlers.

pub mod categories;
pub mod cuisines;
pub mod restaurants;
pub mod users;

use axum::Json;
use axum_extra::extract::WithRejection;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// JSON request body; malformed JSON becomes `BadRequest`.
pub type JsonBody = WithRejection<Json<Value>, AppError>;

/// Parse a numeric path parameter.
pub fn parse_id(raw: &str) -> AppResult<i32> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::bad_request("Bad Parameter"))
}
