//! Authentication/authorization error taxonomy.
//!
//! Display strings double as the client-facing messages; the HTTP status
//! mapping lives in the API layer so this crate stays transport-agnostic.

use thiserror::Error;

use portal_core::StoreError;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("Access token required")]
    TokenMissing,

    /// The token's expiry window has elapsed.
    #[error("Token expired")]
    TokenExpired,

    /// Signature verification failed or the claims are malformed.
    #[error("Invalid token")]
    TokenInvalid,

    /// A verified token referenced an identity the store no longer resolves.
    #[error("User not found or inactive")]
    AccountNotFound,

    /// The store shows the identity as blocked, regardless of token claims.
    #[error("Account is blocked. Contact administrator.")]
    AccountBlocked,

    /// Login failed. Deliberately uniform for unknown-email and
    /// wrong-password so the response never reveals which one it was.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The identity's role is not in the operation's allowed set.
    #[error("Insufficient permissions")]
    InsufficientRole { required: Vec<Role>, actual: Role },

    /// The identity does not own the resource it tried to act on.
    #[error("Access denied: not owner")]
    NotOwner,

    /// The target resource or identity does not exist. Takes priority over
    /// ownership so nonexistent resources leak nothing.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Block/unblock aimed at an admin account; always rejected.
    #[error("Cannot block administrator accounts")]
    ProtectedAccount,

    /// The requested status transition is a no-op (already blocked /
    /// already active). Reported, not silently succeeded, so the audit
    /// trail stays accurate.
    #[error("{0}")]
    NoStateChange(String),

    /// Infrastructure failure underneath an auth decision.
    #[error(transparent)]
    Store(#[from] StoreError),
}
