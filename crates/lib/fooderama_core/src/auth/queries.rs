//! User queries.
//!
//! Every function accepts any Postgres executor so the same query runs on the
//! pool or inside an open transaction.

use sqlx::PgExecutor;

use super::AuthError;
use super::role::Role;
use crate::models::auth::{PublicUser, UserRecord};

/// Column changes for `update_user`. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub password_hash: Option<String>,
    pub blacklisted: Option<bool>,
    pub activated: Option<bool>,
    pub role: Option<Role>,
}

/// List all users without credentials.
pub async fn list_users(executor: impl PgExecutor<'_>) -> Result<Vec<PublicUser>, AuthError> {
    let rows = sqlx::query_as::<_, UserRecord>(
        "SELECT user_id, email, password, role, refresh_token, activated, blacklisted, \
                created_at, updated_at \
         FROM users ORDER BY user_id",
    )
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(PublicUser::from).collect())
}

/// Fetch a user by primary key.
pub async fn find_user_by_id(
    executor: impl PgExecutor<'_>,
    user_id: i32,
) -> Result<Option<UserRecord>, AuthError> {
    let row = sqlx::query_as::<_, UserRecord>(
        "SELECT user_id, email, password, role, refresh_token, activated, blacklisted, \
                created_at, updated_at \
         FROM users WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Fetch a user by email.
pub async fn find_user_by_email(
    executor: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<UserRecord>, AuthError> {
    let row = sqlx::query_as::<_, UserRecord>(
        "SELECT user_id, email, password, role, refresh_token, activated, blacklisted, \
                created_at, updated_at \
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Check whether an email is already registered.
pub async fn email_exists(executor: impl PgExecutor<'_>, email: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(executor)
            .await?;
    Ok(exists)
}

/// Insert a new user and return the stored row.
pub async fn create_user(
    executor: impl PgExecutor<'_>,
    email: &str,
    password_hash: &str,
    role: Role,
    activated: bool,
) -> Result<UserRecord, AuthError> {
    let row = sqlx::query_as::<_, UserRecord>(
        "INSERT INTO users (email, password, role, activated) VALUES ($1, $2, $3, $4) \
         RETURNING user_id, email, password, role, refresh_token, activated, blacklisted, \
                   created_at, updated_at",
    )
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(activated)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// Overwrite the stored refresh token. The previous token stops matching.
pub async fn store_refresh_token(
    executor: impl PgExecutor<'_>,
    user_id: i32,
    refresh_token: &str,
) -> Result<(), AuthError> {
    let result = sqlx::query(
        "UPDATE users SET refresh_token = $2, updated_at = now() WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(refresh_token)
    .execute(executor)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AuthError::NotFound(format!("User with id {user_id} not found")));
    }
    Ok(())
}

/// Apply `changes` to a user, returning the updated row or `None` if absent.
pub async fn update_user(
    executor: impl PgExecutor<'_>,
    user_id: i32,
    changes: &UserChanges,
) -> Result<Option<UserRecord>, AuthError> {
    let row = sqlx::query_as::<_, UserRecord>(
        "UPDATE users SET \
             password = COALESCE($2, password), \
             blacklisted = COALESCE($3, blacklisted), \
             role = COALESCE($4, role), \
             activated = COALESCE($5, activated), \
             updated_at = now() \
         WHERE user_id = $1 \
         RETURNING user_id, email, password, role, refresh_token, activated, blacklisted, \
                   created_at, updated_at",
    )
    .bind(user_id)
    .bind(changes.password_hash.as_deref())
    .bind(changes.blacklisted)
    .bind(changes.role.map(Role::as_str))
    .bind(changes.activated)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}
