//! Authentication middleware chain.
//!
//! Stages compose per route:
//! 1. [`extract_bearer`] reads `Authorization: Bearer <jwt>`.
//! 2. [`validate_jwt`] verifies the access token and stores a
//!    [`RequestContext`] in request extensions.
//! 3. [`is_signed_in`] requires an identity.
//! 4. [`has_permissions`] requires a minimum role.
//! 5. [`RequestContext::is_particular_user_or_admin`] is called by handlers
//!    once the path id is parsed.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use fooderama_core::auth::jwt;
use fooderama_core::auth::role::{self, Role};
use fooderama_core::models::auth::Identity;
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};

const INVALID_HEADER: &str = "Invalid authorization header";
const UNAUTHORIZED: &str = "User is unauthorized";

fn is_jwt_shaped(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

/// Take the token out of an `Authorization` header value.
///
/// The value must be exactly `Bearer` and one JWT-shaped token separated by a
/// single space.
pub fn extract_bearer(header: Option<&str>) -> AppResult<&str> {
    let header = header.ok_or_else(|| AppError::unauthorized(INVALID_HEADER))?;
    let mut words = header.split(' ');
    match (words.next(), words.next(), words.next()) {
        (Some("Bearer"), Some(token), None) if is_jwt_shaped(token) => Ok(token),
        _ => Err(AppError::unauthorized(INVALID_HEADER)),
    }
}

/// Identity attached to a request, if any. Immutable once set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    user: Option<Identity>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            user: Some(identity),
        }
    }

    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> AppResult<&Identity> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::unauthorized(UNAUTHORIZED))
    }

    /// Signed in with at least `required`.
    pub fn has_permissions(&self, required: Role) -> AppResult<&Identity> {
        let user = self.is_signed_in()?;
        if role::permits(Some(user.role), required) {
            Ok(user)
        } else {
            Err(AppError::unauthorized(UNAUTHORIZED))
        }
    }

    /// Signed in as `target_user_id`, or as an admin.
    pub fn is_particular_user_or_admin(&self, target_user_id: i32) -> AppResult<&Identity> {
        let user = self.is_signed_in()?;
        if user.user_id == target_user_id || user.role == Role::Admin {
            Ok(user)
        } else {
            Err(AppError::unauthorized(UNAUTHORIZED))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == Role::Admin)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Verify the bearer token, if one is sent.
///
/// Without an `Authorization` header the request continues anonymously. A
/// header that is malformed or carries an invalid token ends the request
/// with 401.
pub async fn validate_jwt(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = match request.headers().get(AUTHORIZATION) {
        None => RequestContext::anonymous(),
        Some(value) => {
            let token = extract_bearer(value.to_str().ok())?;
            let identity = jwt::verify(token, state.config.token_keys.access.decoding_key())?;
            debug!(user_id = identity.user_id, role = %identity.role, "access token verified");
            RequestContext::signed_in(identity)
        }
    };
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

pub async fn is_signed_in(
    context: RequestContext,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    context.is_signed_in()?;
    Ok(next.run(request).await)
}

/// Require the role given as middleware state.
pub async fn has_permissions(
    State(required): State<Role>,
    context: RequestContext,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    context.has_permissions(required)?;
    Ok(next.run(request).await)
}
