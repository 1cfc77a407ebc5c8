use serde::{Deserialize, Serialize};

use crate::{Identity, Role, UserStatus};

/// Issuer claim stamped on every token.
pub const ISSUER: &str = "portal-app";

/// Audience claim stamped on every token.
pub const AUDIENCE: &str = "portal-users";

/// JWT claims carried by a session token.
///
/// The token is self-contained: verifying the signature reconstructs
/// everything below. Note that `role` and `status` are snapshots taken at
/// login — the credential store is re-checked on every request and its
/// current values are authoritative, never these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id (subject).
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn for_identity(identity: &Identity, iat: i64, exp: i64) -> Self {
        Self {
            sub: identity.id.as_i64(),
            email: identity.email.clone(),
            role: identity.role,
            status: identity.status,
            iat,
            exp,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        }
    }
}
