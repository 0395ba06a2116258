//! Session cookies: `refreshToken` and `userId`.
//!
//! Both are `HttpOnly` on path `/`. Clearing sends the same cookies with an
//! empty value and `Max-Age=0`, so it is safe to repeat.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const USER_ID_COOKIE: &str = "userId";

/// Both session cookie names.
pub const SESSION_COOKIES: [&str; 2] = [USER_ID_COOKIE, REFRESH_TOKEN_COOKIE];

/// Cookie attributes taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            same_site: SameSite::Lax,
            max_age: Duration::days(1),
        }
    }
}

/// Parse `strict`, `lax` or `none`, case-insensitively.
pub fn parse_same_site(value: &str) -> Option<SameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "none" => Some(SameSite::None),
        _ => None,
    }
}

fn session_cookie(
    name: &str,
    value: String,
    max_age: Duration,
    settings: &CookieSettings,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Add both session cookies to the jar.
pub fn issue_session_cookies(
    jar: CookieJar,
    user_id: i32,
    refresh_token: &str,
    settings: &CookieSettings,
) -> CookieJar {
    jar.add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        refresh_token.to_string(),
        settings.max_age,
        settings,
    ))
    .add(session_cookie(
        USER_ID_COOKIE,
        user_id.to_string(),
        settings.max_age,
        settings,
    ))
}

/// Expire the named cookies.
pub fn clear_session_cookies(jar: CookieJar, names: &[&str], settings: &CookieSettings) -> CookieJar {
    names.iter().fold(jar, |jar, name| {
        jar.add(session_cookie(name, String::new(), Duration::ZERO, settings))
    })
}

/// Session cookie values presented by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookies {
    pub user_id: i32,
    pub refresh_token: String,
}

/// Read both session cookies. `None` if either is missing or `userId` is
/// not an integer.
pub fn read_session_cookies(jar: &CookieJar) -> Option<SessionCookies> {
    let user_id = jar.get(USER_ID_COOKIE)?.value().trim().parse().ok()?;
    let refresh_token = jar.get(REFRESH_TOKEN_COOKIE)?.value().to_string();
    if refresh_token.is_empty() {
        return None;
    }
    Some(SessionCookies {
        user_id,
        refresh_token,
    })
}
