//! Restaurant, cuisine, category and dish repositories.
//!
//! Mutations that touch more than one row take `&mut PgConnection` so callers
//! can run them inside a [`crate::tx`] transaction. Single reads accept any
//! executor.

pub mod categories;
pub mod cuisines;
pub mod restaurants;

use thiserror::Error;

/// Menu repository errors.
#[derive(Debug, Error)]
pub enum MenuError {
    /// The request is well-formed but conflicts with stored data.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}
