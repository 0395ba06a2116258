//! Authentication and authorization logic.
//!
//! Provides the RS256 token codec, password hashing, the role hierarchy, and
//! the user queries shared by the signup/login/refresh flows.

pub mod jwt;
pub mod password;
pub mod queries;
pub mod role;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
