/// Stateless session tokens
///
/// A session is an HS256 JWT binding `{sub: user id, email}` to a
/// server-held signing secret; nothing is stored server side and the client
/// revokes a session by discarding its cookie. Expiry is optional: without a
/// configured TTL the token carries no `exp` claim and stays valid until the
/// client deletes it; with a TTL the claim is added and enforced.
use std::collections::HashSet;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Cookie that carries the session token
pub const SESSION_COOKIE: &str = "token";

/// Claims bound into a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Email address bound to the session
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time, present only when a TTL is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthenticated)
    }
}

/// Signing and verification state for session tokens
///
/// Constructed once from configuration and shared through application data;
/// there is no process-wide key state.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: Option<i64>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if ttl_hours.is_none() {
            // Tokens carry no exp claim in this mode; don't demand one.
            validation.validate_exp = false;
            validation.required_spec_claims = HashSet::new();
        }

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: ttl_hours.map(Duration::hours),
        }
    }

    /// Sign a session token for the given identity
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))
    }

    /// Verify a token and return its claims
    ///
    /// Tampered, malformed, expired, or otherwise unusable tokens all come
    /// back as [`AppError::Unauthenticated`]; callers treat every failure
    /// identically and clear the stored cookie.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-signing-secret", None)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = keys();
        let user_id = Uuid::new_v4();

        let token = keys.issue(user_id, "alice@example.com").expect("issue");
        let claims = keys.verify(&token).expect("verify");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.user_id().expect("uuid"), user_id);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let keys = keys();
        let token = keys.issue(Uuid::new_v4(), "alice@example.com").expect("issue");

        // Flip the final signature character
        let mut tampered = token.clone();
        let last = tampered.pop().expect("nonempty token");
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(matches!(
            keys.verify(&tampered),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let keys = keys();
        for garbage in ["", "not-a-token", "a.b", "a.b.c.d", "ey.ey.ey"] {
            assert!(matches!(
                keys.verify(garbage),
                Err(AppError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = keys().issue(Uuid::new_v4(), "alice@example.com").expect("issue");
        let other = SessionKeys::new("a different secret", None);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_ttl_adds_and_enforces_expiry() {
        let user_id = Uuid::new_v4();

        let fresh = SessionKeys::new("secret", Some(1));
        let token = fresh.issue(user_id, "alice@example.com").expect("issue");
        let claims = fresh.verify(&token).expect("verify");
        assert!(claims.exp.is_some());

        // An already-expired token (issued with a negative TTL, well past the
        // default clock-skew leeway) must fail verification.
        let stale = SessionKeys::new("secret", Some(-2));
        let expired = stale.issue(user_id, "alice@example.com").expect("issue");
        assert!(stale.verify(&expired).is_err());
    }
}
