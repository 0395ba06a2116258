//! Authentication service: signup, login, refresh rotation and user updates.
//!
//! Every flow that writes runs in one transaction from `fooderama_core::tx`.

use fooderama_core::auth::jwt;
use fooderama_core::auth::password::{hash_password_blocking, verify_password_blocking};
use fooderama_core::auth::queries::{self, UserChanges};
use fooderama_core::auth::role::Role;
use fooderama_core::models::auth::{Identity, PublicUser, UserRecord};
use fooderama_core::tx;
use fooderama_core::validation::users::{Credentials, UserUpdate};
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::services::cookies::SessionCookies;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_COOKIES: &str = "Invalid cookies";
const BLACKLISTED: &str = "Your account has been blacklisted. Contact an admin";
const UNAUTHORIZED: &str = "User is unauthorized";

/// Tokens handed to a client after a successful sign-in.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user_id: i32,
    pub access_token: String,
    pub refresh_token: String,
}

// ---------------------------------------------------------------------------
// Token issuance
// ---------------------------------------------------------------------------

fn identity_of(user: &UserRecord) -> AppResult<Identity> {
    user.identity()
        .ok_or_else(|| AppError::unauthorized(UNAUTHORIZED))
}

/// Sign a fresh access/refresh pair for `identity`.
fn issue_session(identity: &Identity, config: &ApiConfig) -> AppResult<IssuedSession> {
    let keys = &config.token_keys;
    let access_token = jwt::issue(
        identity,
        keys.access.encoding_key(),
        Some(config.access_token_ttl),
    )?;
    let refresh_token = jwt::issue(identity, keys.refresh.encoding_key(), None)?;
    Ok(IssuedSession {
        user_id: identity.user_id,
        access_token,
        refresh_token,
    })
}

/// Issue a session and persist its refresh token, replacing any previous one.
async fn rotate_session(
    conn: &mut PgConnection,
    user: &UserRecord,
    config: &ApiConfig,
) -> AppResult<IssuedSession> {
    let session = issue_session(&identity_of(user)?, config)?;
    queries::store_refresh_token(conn, user.user_id, &session.refresh_token).await?;
    Ok(session)
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a customer and sign them in.
pub async fn signup(
    pool: &PgPool,
    config: &ApiConfig,
    credentials: Credentials,
) -> AppResult<IssuedSession> {
    let password_hash = hash_password_blocking(credentials.password).await?;
    let mut tx = tx::begin(pool).await?;
    let result = signup_in(&mut tx, config, &credentials.email, &password_hash).await;
    let session = tx::settle(tx, result).await?;
    info!(user_id = session.user_id, "user signed up");
    Ok(session)
}

async fn signup_in(
    conn: &mut PgConnection,
    config: &ApiConfig,
    email: &str,
    password_hash: &str,
) -> AppResult<IssuedSession> {
    if queries::email_exists(&mut *conn, email).await? {
        return Err(AppError::validation_message("Email is already registered"));
    }
    let user = queries::create_user(
        &mut *conn,
        email,
        password_hash,
        Role::Customer,
        config.activate_on_signup,
    )
    .await?;
    rotate_session(conn, &user, config).await
}

/// Check credentials and issue a new session.
///
/// Unknown email and wrong password fail identically.
pub async fn login(
    pool: &PgPool,
    config: &ApiConfig,
    credentials: Credentials,
) -> AppResult<IssuedSession> {
    let user = queries::find_user_by_email(pool, &credentials.email)
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

    if !verify_password_blocking(credentials.password, user.password.clone()).await? {
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }
    if user.blacklisted {
        return Err(AppError::unauthorized(BLACKLISTED));
    }

    let mut tx = tx::begin(pool).await?;
    let result = rotate_session(&mut tx, &user, config).await;
    let session = tx::settle(tx, result).await?;
    info!(user_id = session.user_id, "user logged in");
    Ok(session)
}

/// Exchange the session cookies for a new access token.
///
/// The presented refresh token must equal the stored one and verify against
/// the refresh key. On success the refresh token is rotated, so the presented
/// one stops working.
pub async fn refresh(
    pool: &PgPool,
    config: &ApiConfig,
    cookies: Option<SessionCookies>,
) -> AppResult<IssuedSession> {
    let cookies = cookies.ok_or_else(|| AppError::unauthorized(INVALID_COOKIES))?;
    let mut tx = tx::begin(pool).await?;
    let result = refresh_in(&mut tx, config, &cookies).await;
    tx::settle(tx, result).await
}

async fn refresh_in(
    conn: &mut PgConnection,
    config: &ApiConfig,
    cookies: &SessionCookies,
) -> AppResult<IssuedSession> {
    let invalid = || AppError::unauthorized(INVALID_COOKIES);

    let user = queries::find_user_by_id(&mut *conn, cookies.user_id)
        .await?
        .ok_or_else(invalid)?;
    if user.blacklisted || user.refresh_token.as_deref() != Some(cookies.refresh_token.as_str()) {
        return Err(invalid());
    }
    let presented = jwt::verify(
        &cookies.refresh_token,
        config.token_keys.refresh.decoding_key(),
    )
    .map_err(|_| invalid())?;
    if presented.user_id != user.user_id {
        return Err(invalid());
    }
    rotate_session(conn, &user, config).await
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

pub async fn list_users(pool: &PgPool) -> AppResult<Vec<PublicUser>> {
    Ok(queries::list_users(pool).await?)
}

pub async fn get_user(pool: &PgPool, user_id: i32) -> AppResult<PublicUser> {
    queries::find_user_by_id(pool, user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| AppError::not_found(format!("User with id {user_id} not found")))
}

/// Apply `update` to `user_id` on behalf of `actor`.
///
/// `blacklisted` and `role` may only be changed by an admin.
pub async fn update_user(
    pool: &PgPool,
    actor: &Identity,
    user_id: i32,
    update: UserUpdate,
) -> AppResult<PublicUser> {
    if update.needs_admin() && actor.role != Role::Admin {
        return Err(AppError::unauthorized(UNAUTHORIZED));
    }
    let password_hash = match update.password {
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };
    let changes = UserChanges {
        password_hash,
        blacklisted: update.blacklisted,
        activated: update.activated,
        role: update.role,
    };

    let mut tx = tx::begin(pool).await?;
    let result = queries::update_user(&mut *tx, user_id, &changes)
        .await
        .map_err(AppError::from)
        .and_then(|row| {
            row.ok_or_else(|| AppError::not_found(format!("User with id {user_id} not found")))
        });
    let user = tx::settle(tx, result).await?;
    info!(user_id, actor = actor.user_id, "user updated");
    Ok(PublicUser::from(user))
}
