//! `/api/v1/users` handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::CookieJar;
use axum_extra::extract::WithRejection;
use fooderama_core::models::auth::PublicUser;
use fooderama_core::validation::users;

use super::{JsonBody, parse_id};
use crate::AppState;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::middleware::auth::RequestContext;
use crate::models::{LogoutResponse, TokenResponse};
use crate::services::auth::{self, IssuedSession};
use crate::services::cookies::{
    SESSION_COOKIES, clear_session_cookies, issue_session_cookies, read_session_cookies,
};

fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: IssuedSession,
) -> (CookieJar, Json<TokenResponse>) {
    let jar = issue_session_cookies(
        jar,
        session.user_id,
        &session.refresh_token,
        &state.config.cookies,
    );
    (
        jar,
        Json(TokenResponse {
            access_token: session.access_token,
        }),
    )
}

/// `GET /api/v1/users` (admin).
pub async fn list_users_handler(State(state): State<AppState>) -> AppResult<Json<Vec<PublicUser>>> {
    Ok(Json(auth::list_users(&state.pool).await?))
}

/// `POST /api/v1/users/signup`
pub async fn signup_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let credentials = users::signup(&body)
        .map_err(|e| AppError::validation("Validation error during signup", e))?;
    let session = auth::signup(&state.pool, &state.config, credentials).await?;
    Ok(session_response(&state, jar, session))
}

/// `POST /api/v1/users/login`
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    if body.is_array() {
        return Err(AppError::validation_message("Request body should be an object"));
    }
    let credentials =
        users::login(&body).map_err(|e| AppError::validation("Invalid email or password", e))?;
    let session = auth::login(&state.pool, &state.config, credentials).await?;
    Ok(session_response(&state, jar, session))
}

/// `GET /api/v1/users/refresh`
///
/// Rejected cookies are cleared in the same response.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), (CookieJar, AppError)> {
    let cookies = read_session_cookies(&jar);
    match auth::refresh(&state.pool, &state.config, cookies).await {
        Ok(session) => Ok(session_response(&state, jar, session)),
        Err(e) if e.kind == ErrorKind::Unauthorized => Err((
            clear_session_cookies(jar, &SESSION_COOKIES, &state.config.cookies),
            e,
        )),
        Err(e) => Err((jar, e)),
    }
}

/// `GET /api/v1/users/logout`
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let jar = clear_session_cookies(jar, &SESSION_COOKIES, &state.config.cookies);
    (jar, Json(LogoutResponse { success: true }))
}

/// `GET /api/v1/users/{id}` (self or admin).
pub async fn get_user_handler(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<String>,
) -> AppResult<Json<PublicUser>> {
    let id = parse_id(&id)?;
    context.is_particular_user_or_admin(id)?;
    Ok(Json(auth::get_user(&state.pool, id).await?))
}

/// `PUT /api/v1/users/{id}` (self or admin).
pub async fn update_user_handler(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<String>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<PublicUser>> {
    let id = parse_id(&id)?;
    let actor = context.is_particular_user_or_admin(id)?;
    if body.is_array() {
        return Err(AppError::validation_message(
            "Arrays can't be accepted for this operation",
        ));
    }
    let update = users::update(&body)
        .map_err(|e| AppError::validation("Validation error during user update", e))?;
    Ok(Json(auth::update_user(&state.pool, actor, id, update).await?))
}
