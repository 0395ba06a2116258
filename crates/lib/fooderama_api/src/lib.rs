//! # fooderama_api
//!
//! HTTP API library for Fooderama.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;
use axum::http::Uri;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use fooderama_core::auth::role::Role;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::error::{AppError, ErrorKind};
use crate::handlers::{categories, cuisines, restaurants, users};
use crate::middleware::auth::{has_permissions, is_signed_in, validate_jwt};
use crate::middleware::logging::log_requests;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
}

/// Run embedded database migrations.
///
/// Delegates to `fooderama_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    fooderama_core::migrate::migrate(pool).await
}

async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("Route {} not found", uri.path()))
}

async fn method_not_allowed() -> AppError {
    AppError::new(ErrorKind::MethodNotAllowed, "Method not allowed")
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Anonymous access
    let public = Router::new()
        .route(routes::USERS_SIGNUP, post(users::signup_handler))
        .route(routes::USERS_LOGIN, post(users::login_handler))
        .route(routes::USERS_REFRESH, get(users::refresh_handler))
        .route(routes::USERS_LOGOUT, get(users::logout_handler))
        .route(routes::RESTAURANTS, get(restaurants::list_restaurants_handler))
        .route(routes::RESTAURANTS_ID, get(restaurants::get_restaurant_handler))
        .route(routes::CUISINES, get(cuisines::list_cuisines_handler))
        .route(routes::CUISINES_ID, get(cuisines::get_cuisine_handler))
        .route(routes::CATEGORIES, get(categories::list_categories_handler))
        .route(routes::CATEGORIES_ID, get(categories::get_category_handler));

    // Signed in; handlers check self-or-admin
    let signed_in = Router::new()
        .route(
            routes::USERS_ID,
            get(users::get_user_handler).put(users::update_user_handler),
        )
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), validate_jwt))
                .layer(from_fn(is_signed_in)),
        );

    // Admin only
    let admin = Router::new()
        .route(routes::USERS, get(users::list_users_handler))
        .route(
            routes::RESTAURANTS,
            post(restaurants::create_restaurants_handler)
                .delete(restaurants::delete_restaurants_handler),
        )
        .route(
            routes::RESTAURANTS_ID,
            axum::routing::put(restaurants::update_restaurant_handler)
                .delete(restaurants::delete_restaurant_handler),
        )
        .route(routes::CUISINES, post(cuisines::create_cuisine_handler))
        .route(
            routes::CUISINES_ID,
            axum::routing::put(cuisines::update_cuisine_handler)
                .delete(cuisines::delete_cuisine_handler),
        )
        .route(routes::CATEGORIES, post(categories::create_category_handler))
        .route(
            routes::CATEGORIES_ID,
            axum::routing::put(categories::update_category_handler)
                .delete(categories::delete_category_handler),
        )
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), validate_jwt))
                .layer(from_fn(is_signed_in))
                .layer(from_fn_with_state(Role::Admin, has_permissions)),
        );

    Router::new()
        .merge(public)
        .merge(signed_in)
        .merge(admin)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use fooderama_core::models::auth::Identity;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support;

    fn identity(user_id: i32, role: Role) -> Identity {
        Identity {
            user_id,
            email: format!("user{user_id}@example.com"),
            role,
            activated: true,
        }
    }

    fn bearer(user_id: i32, role: Role) -> String {
        format!("Bearer {}", test_support::access_token(&identity(user_id, role)))
    }

    async fn send(request: Request<Body>) -> Response {
        router(test_support::state()).oneshot(request).await.unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, auth: Option<String>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let resp = send(Request::get("/api/v1/nothing").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = json_body(resp).await;
        assert_eq!(json["name"], "NotFound");
        assert_eq!(json["className"], "not-found");
    }

    #[tokio::test]
    async fn unsupported_method_is_json_405() {
        let resp = send(
            Request::patch(routes::CUISINES)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(resp).await["code"], 405);
    }

    #[tokio::test]
    async fn admin_routes_reject_anonymous_and_non_admins() {
        let body = json!({ "cuisineName": "Thai" });
        let resp = send(json_request("POST", routes::CUISINES, None, body.clone())).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "User is unauthorized");

        let resp = send(json_request(
            "POST",
            routes::CUISINES,
            Some(bearer(2, Role::Manager)),
            body,
        ))
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_gets_validation_errors_before_any_write() {
        let resp = send(json_request(
            "POST",
            routes::RESTAURANTS,
            Some(bearer(1, Role::Admin)),
            json!({ "restName": "x", "Cuisines": [{ "cuisineId": -1 }] }),
        ))
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["name"], "ValidationError");
        assert!(json["data"]["fieldErrors"]["restName"].is_array());
        assert_eq!(
            json["data"]["fieldErrors"]["Cuisines.0.cuisineId"][0],
            "Number must be greater than or equal to 0"
        );
    }

    #[tokio::test]
    async fn bad_path_id_is_bad_parameter() {
        let resp = send(
            Request::get("/api/v1/users/abc")
                .header(AUTHORIZATION, bearer(1, Role::Admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["name"], "BadRequest");
        assert_eq!(json["message"], "Bad Parameter");
    }

    #[tokio::test]
    async fn users_may_only_read_themselves() {
        let resp = send(
            Request::get("/api/v1/users/5")
                .header(AUTHORIZATION, bearer(6, Role::Customer))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(Request::get("/api/v1/users/5").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_admin_cannot_blacklist_even_themselves() {
        let resp = send(json_request(
            "PUT",
            "/api/v1/users/6",
            Some(bearer(6, Role::Customer)),
            json!({ "blacklisted": true }),
        ))
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "User is unauthorized");
    }

    #[tokio::test]
    async fn non_admin_cannot_activate_themselves() {
        let resp = send(json_request(
            "PUT",
            "/api/v1/users/6",
            Some(bearer(6, Role::Manager)),
            json!({ "password": "longenough", "activated": true }),
        ))
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "User is unauthorized");
    }

    #[tokio::test]
    async fn signup_validation_reports_fields() {
        let resp = send(json_request(
            "POST",
            routes::USERS_SIGNUP,
            None,
            json!({ "email": "nope", "password": "abc" }),
        ))
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["message"], "Validation error during signup");
        assert_eq!(json["data"]["fieldErrors"]["email"][0], "Invalid email");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let request = Request::post(routes::USERS_LOGIN)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = send(request).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["name"], "BadRequest");
    }

    #[tokio::test]
    async fn refresh_without_cookies_clears_them() {
        let resp = send(
            Request::get(routes::USERS_REFRESH)
                .header(COOKIE, "userId=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let cleared: Vec<_> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
        assert_eq!(json_body(resp).await["message"], "Invalid cookies");
    }

    #[tokio::test]
    async fn logout_always_succeeds() {
        let resp = send(Request::get(routes::USERS_LOGOUT).body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(json_body(resp).await, json!({ "success": true }));
    }
}
