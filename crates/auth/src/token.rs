//! Session token service.
//!
//! Stateless HS256 tokens: issuance writes nothing, verification needs only
//! the shared secret. Revocation is deliberately absent — a blocked identity
//! is caught by the per-request credential re-check, not by invalidating
//! outstanding tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};

use crate::{AuthError, Claims, Identity, AUDIENCE, ISSUER};

/// Default validity window for issued tokens.
pub const DEFAULT_TTL_HOURS: i64 = 24;

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        // No clock leeway: an expired token is expired.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn with_default_ttl(secret: &[u8]) -> Self {
        Self::new(secret, Duration::hours(DEFAULT_TTL_HOURS))
    }

    /// Issue a signed token for `identity`. Pure: no state is written.
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims::for_identity(
            identity,
            now.timestamp(),
            (now + self.ttl).timestamp(),
        );

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |e| {
                tracing::error!("token signing failed: {e}");
                AuthError::TokenInvalid
            },
        )
    }

    /// Verify signature, expiry, issuer, and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, UserStatus};
    use portal_core::UserId;

    fn identity() -> Identity {
        Identity {
            id: UserId::new(7),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            role: Role::User,
            status: UserStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issue_then_verify_round_trips_identity_claims() {
        let svc = TokenService::with_default_ttl(b"test-secret");
        let id = identity();

        let token = svc.issue(&id).unwrap();
        let claims = svc.verify(&token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.status, UserStatus::Active);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let svc = TokenService::new(b"test-secret", Duration::hours(-1));
        let token = svc.issue(&identity()).unwrap();

        assert_eq!(svc.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let issuer = TokenService::with_default_ttl(b"secret-a");
        let verifier = TokenService::with_default_ttl(b"secret-b");

        let token = issuer.issue(&identity()).unwrap();
        assert_eq!(verifier.verify(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn garbage_is_invalid() {
        let svc = TokenService::with_default_ttl(b"test-secret");
        assert_eq!(svc.verify("not-a-jwt"), Err(AuthError::TokenInvalid));
    }
}
