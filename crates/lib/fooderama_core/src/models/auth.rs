//! Authentication domain models.
//!
//! `UserRecord` mirrors the `users` table; `PublicUser` is the projection that
//! is safe to return to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::role::Role;

/// Identity embedded in access and refresh tokens.
///
/// `role` reflects the value at issuance time and may be stale relative to the
/// database until the access token expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
    pub activated: bool,
}

/// JWT claims: the identity plus registered time claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub identity: Identity,
    /// Unique token id, so two tokens issued in the same second differ.
    pub jti: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp). Absent on refresh tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Full `users` row, including credentials.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: i32,
    pub email: String,
    pub password: String,
    pub role: String,
    pub refresh_token: Option<String>,
    pub activated: bool,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Parsed role, `None` when the stored value is not a recognised tier.
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Token identity for this user, `None` when the stored role is unrecognised.
    pub fn identity(&self) -> Option<Identity> {
        Some(Identity {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role()?,
            activated: self.activated,
        })
    }
}

/// User without `password` and `refresh_token`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub activated: bool,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for PublicUser {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id,
            email: record.email,
            role: record.role,
            activated: record.activated,
            blacklisted: record.blacklisted,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
