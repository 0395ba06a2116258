//! User request schemas.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::{Validated, bool_like_opt, parse, trimmed, trimmed_opt};
use crate::auth::role::Role;

pub const MAX_EMAIL_LEN: u64 = 256;
pub const MIN_PASSWORD_LEN: u64 = 6;
pub const MAX_PASSWORD_LEN: u64 = 30;
/// Upper bound on a login password, which is only compared, never stored.
pub const MAX_LOGIN_PASSWORD_LEN: u64 = 256;

/// Email and plaintext password from a signup or login body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct SignupRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        email(message = "Invalid email"),
        length(max = MAX_EMAIL_LEN, message = "Email must contain at most 256 character(s)")
    )]
    email: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(
        min = MIN_PASSWORD_LEN,
        max = MAX_PASSWORD_LEN,
        message = "Password must contain 6 to 30 character(s)"
    ))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        email(message = "Invalid email"),
        length(max = MAX_EMAIL_LEN, message = "Email must contain at most 256 character(s)")
    )]
    email: String,
    #[validate(length(
        max = MAX_LOGIN_PASSWORD_LEN,
        message = "Password must contain at most 256 character(s)"
    ))]
    password: String,
}

/// Partial user update. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(
        min = MIN_PASSWORD_LEN,
        max = MAX_PASSWORD_LEN,
        message = "Password must contain 6 to 30 character(s)"
    ))]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "bool_like_opt")]
    pub blacklisted: Option<bool>,
    #[serde(default, deserialize_with = "bool_like_opt")]
    pub activated: Option<bool>,
    pub role: Option<Role>,
}

impl UserUpdate {
    /// Whether the update touches fields only an admin may change.
    pub fn needs_admin(&self) -> bool {
        self.blacklisted.is_some() || self.activated.is_some() || self.role.is_some()
    }
}

/// Signup body: `{ email, password }` with password 6–30 characters after trimming.
pub fn signup(body: &Value) -> Validated<Credentials> {
    let SignupRequest { email, password } = parse(body)?;
    Ok(Credentials { email, password })
}

/// Login body: `{ email, password }`. The password is taken verbatim.
pub fn login(body: &Value) -> Validated<Credentials> {
    let LoginRequest { email, password } = parse(body)?;
    Ok(Credentials { email, password })
}

/// Update body: `{ password?, blacklisted?, activated?, role? }`.
///
/// `blacklisted` and `activated` accept a boolean or `"true"`/`"false"`.
pub fn update(body: &Value) -> Validated<UserUpdate> {
    parse(body)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn signup_accepts_valid_credentials() {
        let creds = signup(&json!({ "email": " a@b.com ", "password": "  abc123  " })).unwrap();
        assert_eq!(creds.email, "a@b.com");
        assert_eq!(creds.password, "abc123");
    }

    #[test]
    fn signup_reports_each_field() {
        let errors = signup(&json!({ "email": "not-an-email", "password": "abc" })).unwrap_err();
        assert_eq!(errors.for_field("email"), ["Invalid email"]);
        assert_eq!(
            errors.for_field("password"),
            ["Password must contain 6 to 30 character(s)"]
        );
    }

    #[test]
    fn signup_rejects_long_password() {
        let body = json!({ "email": "a@b.com", "password": "x".repeat(31) });
        let errors = signup(&body).unwrap_err();
        assert_eq!(errors.for_field("password").len(), 1);
        assert!(errors.for_field("email").is_empty());
    }

    #[test]
    fn signup_requires_email() {
        let errors = signup(&json!({ "password": "abc123" })).unwrap_err();
        assert_eq!(errors.for_field("email"), ["Required"]);
    }

    #[test]
    fn signup_rejects_arrays() {
        let errors = signup(&json!([{ "email": "a@b.com", "password": "abc123" }])).unwrap_err();
        assert_eq!(errors.form_errors, ["Expected object, received array"]);
    }

    #[test]
    fn login_keeps_password_verbatim() {
        let creds = login(&json!({ "email": "a@b.com", "password": " x " })).unwrap();
        assert_eq!(creds.password, " x ");
        assert!(login(&json!({ "email": "a@b.com", "password": "x".repeat(257) })).is_err());
    }

    #[test]
    fn login_rejects_malformed_email() {
        for email in ["no-at-sign", "a b@c.com", ""] {
            let errors = login(&json!({ "email": email, "password": "abc123" })).unwrap_err();
            assert_eq!(errors.for_field("email"), ["Invalid email"], "{email:?}");
        }
    }

    #[test]
    fn update_accepts_string_booleans_and_role_alias() {
        let update = update(&json!({ "blacklisted": "true", "role": "user" })).unwrap();
        assert_eq!(update.blacklisted, Some(true));
        assert_eq!(update.role, Some(Role::Customer));
        assert_eq!(update.password, None);
        assert!(update.needs_admin());
    }

    #[test]
    fn activation_is_admin_only() {
        let update = update(&json!({ "activated": true })).unwrap();
        assert_eq!(update.activated, Some(true));
        assert!(update.needs_admin());
    }

    #[test]
    fn update_password_only_is_not_admin_only() {
        let update = update(&json!({ "password": " secret1 " })).unwrap();
        assert_eq!(update.password.as_deref(), Some("secret1"));
        assert!(!update.needs_admin());
    }

    #[test]
    fn update_rejects_bad_values() {
        assert!(update(&json!({ "blacklisted": "yes" })).is_err());
        assert!(update(&json!({ "role": "root" })).is_err());
        let errors = update(&json!({ "password": "abc" })).unwrap_err();
        assert_eq!(errors.for_field("password").len(), 1);
    }
}
