//! Password hashing and bearer tokens.
//!
//! Passwords are stored as argon2 PHC strings. Access tokens are HS256 JWTs
//! whose `sub` claim is the user's email.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// False for a wrong password and for an unparseable stored hash.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Ten years.
const MAX_TTL_MINUTES: u64 = 10 * 365 * 24 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Signing material for access tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &str, ttl_minutes: u64) -> Self {
        let minutes = i64::try_from(ttl_minutes.min(MAX_TTL_MINUTES)).unwrap_or(0);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(minutes),
        }
    }

    pub fn issue(&self, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: email.to_string(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// The subject of a valid, unexpired token.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<String> {
        let validation = Validation::new(Algorithm::HS256);
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected access token");
                None
            }
        }
    }
}

/// The authenticated caller, taken from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                value
                    .strip_prefix("Bearer ")
                    .or_else(|| value.strip_prefix("bearer "))
            })
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(ApiError::unauthorized)?;

        state
            .keys
            .verify(token)
            .map(|email| Self { email })
            .ok_or_else(ApiError::unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn token_carries_subject() {
        let keys = TokenKeys::new("secret", 30);
        let token = keys.issue("a@example.com").unwrap();
        assert_eq!(keys.verify(&token).as_deref(), Some("a@example.com"));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenKeys::new("one", 30).issue("a@example.com").unwrap();
        assert!(TokenKeys::new("two", 30).verify(&token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("secret", 30);
        let claims = Claims {
            sub: "a@example.com".into(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_none());
    }
}
