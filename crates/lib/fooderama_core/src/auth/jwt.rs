//! RS256 token issuance and verification.
//!
//! Access and refresh tokens are signed with separate RSA key pairs. Both
//! sides pin the algorithm, so a token signed with anything other than RS256
//! is rejected as malformed.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{Identity, TokenClaims};

const ALGORITHM: Algorithm = Algorithm::RS256;

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 10;

/// An RSA private/public key pair for one token class.
#[derive(Clone)]
pub struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    /// Parse a PEM-encoded RSA private key and its public key.
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AuthError::InvalidKey(format!("private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AuthError::InvalidKey(format!("public key: {e}")))?;
        Ok(Self { encoding, decoding })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyPair(<redacted>)")
    }
}

/// The two key pairs used by the API.
#[derive(Clone, Debug)]
pub struct TokenKeys {
    pub access: KeyPair,
    pub refresh: KeyPair,
}

impl TokenKeys {
    pub fn from_rsa_pem(
        access_private: &[u8],
        access_public: &[u8],
        refresh_private: &[u8],
        refresh_public: &[u8],
    ) -> Result<Self, AuthError> {
        Ok(Self {
            access: KeyPair::from_rsa_pem(access_private, access_public)?,
            refresh: KeyPair::from_rsa_pem(refresh_private, refresh_public)?,
        })
    }
}

/// Sign `identity` into a compact token. Without `ttl` the token carries no
/// expiry claim. Every call yields a distinct token.
pub fn issue(
    identity: &Identity,
    key: &EncodingKey,
    ttl: Option<Duration>,
) -> Result<String, AuthError> {
    issue_at(identity, key, ttl, Utc::now())
}

fn issue_at(
    identity: &Identity,
    key: &EncodingKey,
    ttl: Option<Duration>,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = TokenClaims {
        identity: identity.clone(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: ttl.map(|ttl| (now + ttl).timestamp()),
    };
    encode(&Header::new(ALGORITHM), &claims, key)
        .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify a token and return the identity it carries.
///
/// Expiry is checked with zero leeway. Tokens without `exp` never expire.
pub fn verify(token: &str, key: &DecodingKey) -> Result<Identity, AuthError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.required_spec_claims.clear();

    match decode::<TokenClaims>(token, key, &validation) {
        Ok(data) => Ok(data.claims.identity),
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(AuthError::TokenExpired),
        Err(_) => Err(AuthError::MalformedToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role::Role;

    const ACCESS_PRIVATE: &str = include_str!("../../../../../fixtures/keys/access_private.pem");
    const ACCESS_PUBLIC: &str = include_str!("../../../../../fixtures/keys/access_public.pem");
    const REFRESH_PRIVATE: &str = include_str!("../../../../../fixtures/keys/refresh_private.pem");
    const REFRESH_PUBLIC: &str = include_str!("../../../../../fixtures/keys/refresh_public.pem");

    fn keys() -> TokenKeys {
        TokenKeys::from_rsa_pem(
            ACCESS_PRIVATE.as_bytes(),
            ACCESS_PUBLIC.as_bytes(),
            REFRESH_PRIVATE.as_bytes(),
            REFRESH_PUBLIC.as_bytes(),
        )
        .expect("fixture keys parse")
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: 42,
            email: "a@b.com".into(),
            role,
            activated: true,
        }
    }

    #[test]
    fn round_trip_before_expiry() {
        let keys = keys();
        for role in [Role::Customer, Role::Manager, Role::Admin] {
            let id = identity(role);
            let ttl = Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES);
            let token = issue(&id, keys.access.encoding_key(), Some(ttl)).expect("issue");
            assert_eq!(token.split('.').count(), 3);
            let decoded = verify(&token, keys.access.decoding_key()).expect("verify");
            assert_eq!(decoded, id);
        }
    }

    #[test]
    fn token_without_ttl_has_no_expiry_and_verifies() {
        let keys = keys();
        let issued_long_ago = Utc::now() - Duration::days(3650);
        let token = issue_at(
            &identity(Role::Customer),
            keys.refresh.encoding_key(),
            None,
            issued_long_ago,
        )
        .expect("issue");
        let decoded = verify(&token, keys.refresh.decoding_key()).expect("verify");
        assert_eq!(decoded.user_id, 42);
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let keys = keys();
        let now = Utc::now();
        let id = identity(Role::Customer);
        let first = issue_at(&id, keys.refresh.encoding_key(), None, now).expect("issue");
        let second = issue_at(&id, keys.refresh.encoding_key(), None, now).expect("issue");
        assert_ne!(first, second);
        assert_eq!(verify(&first, keys.refresh.decoding_key()).expect("verify"), id);
        assert_eq!(verify(&second, keys.refresh.decoding_key()).expect("verify"), id);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let keys = keys();
        let an_hour_ago = Utc::now() - Duration::hours(1);
        let token = issue_at(
            &identity(Role::Admin),
            keys.access.encoding_key(),
            Some(Duration::minutes(10)),
            an_hour_ago,
        )
        .expect("issue");
        assert!(matches!(
            verify(&token, keys.access.decoding_key()),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn token_from_other_key_pair_is_malformed() {
        let keys = keys();
        let token = issue(&identity(Role::Admin), keys.refresh.encoding_key(), None).expect("issue");
        assert!(matches!(
            verify(&token, keys.access.decoding_key()),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn tampered_payload_is_malformed() {
        let keys = keys();
        let token = issue(
            &identity(Role::Customer),
            keys.access.encoding_key(),
            Some(Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES)),
        )
        .expect("issue");
        let forged = issue(
            &identity(Role::Admin),
            keys.access.encoding_key(),
            Some(Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES)),
        )
        .expect("issue");
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
        assert!(matches!(
            verify(&spliced, keys.access.decoding_key()),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = keys();
        for token in ["", "abc", "a.b.c", "eyJhbGciOiJSUzI1NiJ9.e30."] {
            assert!(matches!(
                verify(token, keys.access.decoding_key()),
                Err(AuthError::MalformedToken)
            ));
        }
    }

    #[test]
    fn invalid_pem_is_reported() {
        assert!(matches!(
            KeyPair::from_rsa_pem(b"not a key", ACCESS_PUBLIC.as_bytes()),
            Err(AuthError::InvalidKey(_))
        ));
    }
}
