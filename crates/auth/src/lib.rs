//! `portal-auth` — authentication and authorization boundary.
//!
//! Token issuance/verification, credential lookup contracts, and the
//! per-request access-control evaluator. This crate is intentionally
//! decoupled from HTTP and storage: the API layer adapts requests into calls
//! here, and `portal-infra` provides the store implementations.

pub mod access;
pub mod claims;
pub mod error;
pub mod identity;
pub mod password;
pub mod rate_limit;
pub mod roles;
pub mod store;
pub mod token;

pub use access::{authenticate, guard_status_change, require_owner, require_role};
pub use access::{OwnedResource, OwnershipResolver};
pub use claims::{Claims, AUDIENCE, ISSUER};
pub use error::AuthError;
pub use identity::{Identity, IdentitySummary, UserStatus};
pub use rate_limit::{RateDecision, RateLimiter};
pub use roles::Role;
pub use store::{CredentialStore, UserCounts};
pub use token::TokenService;
