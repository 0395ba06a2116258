//! # fooderama_core
//!
//! Core domain logic for Fooderama: tokens, credentials, roles, request
//! validation, and the transactional repositories behind the HTTP API.

pub mod auth;
pub mod menu;
pub mod migrate;
pub mod models;
pub mod tx;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
