//! Rate-limiting contract for the login path.
//!
//! The limiter is an external collaborator (fixed window in `portal-infra`).
//! Login must consult it before touching credentials: limited attempts never
//! reach the credential check and therefore produce no `login.fail` audit
//! event.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    /// Count one attempt for `key` (normally the source IP) and decide.
    fn check(&self, key: &str) -> RateDecision;
}
