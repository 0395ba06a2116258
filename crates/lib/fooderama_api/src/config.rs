//! API server configuration.

use std::sync::Arc;

use chrono::Duration;
use fooderama_core::auth::jwt::{DEFAULT_ACCESS_TOKEN_TTL_MINUTES, TokenKeys};

use crate::services::cookies::CookieSettings;

/// Image used when a restaurant is created without `restImage`.
pub const DEFAULT_RESTAURANT_IMAGE: &str =
    "https://images.unsplash.com/photo-1517248135467-4c7edcad34c4";

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// RSA key pairs for access and refresh tokens.
    pub token_keys: Arc<TokenKeys>,
    /// Access token lifetime.
    pub access_token_ttl: Duration,
    /// Attributes of the session cookies.
    pub cookies: CookieSettings,
    /// Whether new signups start activated.
    pub activate_on_signup: bool,
    /// Fallback `restImage`.
    pub default_restaurant_image: String,
}

impl ApiConfig {
    /// Configuration with defaults for everything but the keys.
    pub fn new(token_keys: TokenKeys) -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            pg_connection_url: "postgres://localhost:5432/fooderama".into(),
            token_keys: Arc::new(token_keys),
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            cookies: CookieSettings::default(),
            activate_on_signup: true,
            default_restaurant_image: DEFAULT_RESTAURANT_IMAGE.into(),
        }
    }
}
