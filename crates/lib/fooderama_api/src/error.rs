//! Application error types.
//!
//! Every failure leaving a handler is an [`AppError`]: a taxonomy [`ErrorKind`]
//! plus a client-facing message and optional structured detail.

use std::fmt;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fooderama_core::auth::AuthError;
use fooderama_core::menu::MenuError;
use fooderama_core::validation::FieldErrors;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

const GENERAL_ERROR_MESSAGE: &str = "Internal server error";

/// Error taxonomy. Each kind fixes the HTTP status and the machine-readable
/// class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationError,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Timeout,
    TooManyRequests,
    GeneralError,
    NotImplemented,
    BadGateway,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::ValidationError | ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::GeneralError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::TooManyRequests => "TooManyRequests",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::BadGateway => "BadGateway",
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation-error",
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Unauthorized => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::MethodNotAllowed => "method-not-allowed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TooManyRequests => "too-many-requests",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::NotImplemented => "not-implemented",
            ErrorKind::BadGateway => "bad-gateway",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Application-level error with HTTP status mapping.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    /// Structured detail, e.g. per-field validation messages.
    pub data: Option<Value>,
    pub errors: Option<Value>,
    /// Server-side cause. Logged, never sent to the client.
    pub source_detail: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source_detail: None,
        }
    }

    /// Schema failure with per-field detail in `data`.
    pub fn validation(message: impl Into<String>, errors: FieldErrors) -> Self {
        let mut err = Self::new(ErrorKind::ValidationError, message);
        err.data = serde_json::to_value(errors).ok();
        err
    }

    pub fn validation_message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// 500 with a fixed public message; `detail` is only logged.
    pub fn general(detail: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::GeneralError, GENERAL_ERROR_MESSAGE);
        err.source_detail = Some(detail.into());
        err
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    fn body(&self) -> ErrorResponse {
        ErrorResponse {
            name: self.kind.name().to_string(),
            message: self.message.clone(),
            code: self.kind.status().as_u16(),
            class_name: self.kind.class_name().to_string(),
            data: self.data.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                kind = %self.kind,
                message = %self.message,
                detail = self.source_detail.as_deref().unwrap_or(""),
                "request failed"
            );
        } else {
            warn!(kind = %self.kind, message = %self.message, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
            _ => AppError::general(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MalformedToken => AppError::unauthorized("Malformed JWT"),
            AuthError::TokenExpired => AppError::unauthorized("Token expired"),
            AuthError::ValidationError(msg) => AppError::validation_message(msg),
            AuthError::NotFound(msg) => AppError::not_found(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::InvalidKey(msg) | AuthError::TokenError(msg) | AuthError::Internal(msg) => {
                AppError::general(msg)
            }
        }
    }
}

impl From<MenuError> for AppError {
    fn from(e: MenuError) -> Self {
        match e {
            MenuError::Validation(msg) => AppError::validation_message(msg),
            MenuError::NotFound(msg) => AppError::not_found(msg),
            MenuError::Db(e) => AppError::from(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}
