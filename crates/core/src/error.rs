//! Storage error model.
//!
//! Keep this focused on infrastructure failures (connectivity, query
//! execution). Authorization and domain failures belong to `portal-auth`.

use thiserror::Error;

/// Result type used by store implementations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure talking to a backing store.
///
/// The message is operator-facing; callers decide how much of it reaches the
/// client (production deployments surface a generic 500).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A read or write against the store failed.
    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}
