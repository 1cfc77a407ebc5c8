//! Credential store contract (implemented by `portal-infra`).
//!
//! The core never writes password hashes; account state transitions go
//! through `set_status` on behalf of an authorized admin action.

use async_trait::async_trait;
use serde::Serialize;

use portal_core::{PageRequest, StoreResult, UserId};

use crate::{Identity, UserStatus};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an identity by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>>;

    /// Set account status, returning the number of affected rows (0 when the
    /// identity does not exist).
    async fn set_status(&self, id: UserId, status: UserStatus) -> StoreResult<u64>;

    /// Page through identities, newest first. `search` is a case-insensitive
    /// substring match over email and role.
    async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Identity>, u64)>;

    /// Aggregate counts for the admin statistics surface.
    async fn counts(&self) -> StoreResult<UserCounts>;
}

/// Status/role breakdown of the user base.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserCounts {
    pub total_users: u64,
    pub active_users: u64,
    pub blocked_users: u64,
    pub admin_users: u64,
    pub regular_users: u64,
}
