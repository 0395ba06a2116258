//! Domain models shared by the repositories and the HTTP layer.

pub mod auth;
pub mod menu;
