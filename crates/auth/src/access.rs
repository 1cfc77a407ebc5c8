//! Access-control evaluator.
//!
//! Per-request state machine with terminal outcomes Authorized /
//! Denied(reason) / Error(store failure), expressed as `Result<_, AuthError>`:
//!
//! 1. authenticate — token verify + credential re-fetch + liveness check
//! 2. require_role — role set membership
//! 3. require_owner — ownership of a specific project/task (admins skip)
//! 4. guard_status_change — block/unblock safety rules
//!
//! Role violations are reported before ownership (no resource lookup needed);
//! nonexistent resources report `NotFound` before any ownership comparison.

use async_trait::async_trait;

use portal_core::{ProjectId, StoreResult, TaskId, UserId};

use crate::{AuthError, CredentialStore, Identity, Role, TokenService, UserStatus};

/// An owned resource an operation targets. The set of owned kinds is closed:
/// projects own directly, tasks own through their parent project.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OwnedResource {
    Project(ProjectId),
    Task(TaskId),
}

impl OwnedResource {
    pub fn kind(&self) -> &'static str {
        match self {
            OwnedResource::Project(_) => "Project",
            OwnedResource::Task(_) => "Task",
        }
    }
}

/// Resolves the owning identity of a resource (implemented by the
/// project/task store in `portal-infra`).
#[async_trait]
pub trait OwnershipResolver: Send + Sync {
    /// `None` when the resource does not exist.
    async fn owner_of(&self, resource: OwnedResource) -> StoreResult<Option<UserId>>;
}

/// Authenticate a presented bearer token.
///
/// Tokens are not revoked on block, so every request re-validates liveness
/// against current store state: the returned identity comes from the store,
/// and its role/status — not the token's embedded claims — are authoritative.
pub async fn authenticate(
    token: Option<&str>,
    tokens: &TokenService,
    credentials: &dyn CredentialStore,
) -> Result<Identity, AuthError> {
    let token = token.ok_or(AuthError::TokenMissing)?;
    let claims = tokens.verify(token)?;

    let identity = credentials
        .find_by_id(UserId::new(claims.sub))
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    match identity.status {
        UserStatus::Blocked => Err(AuthError::AccountBlocked),
        UserStatus::Active => Ok(identity),
    }
}

/// Require the identity's role to be in the operation's allowed set.
pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole {
            required: allowed.to_vec(),
            actual: identity.role,
        })
    }
}

/// Require the identity to own the resource. Admins bypass entirely.
///
/// Existence is checked first: a nonexistent resource yields `NotFound`
/// rather than leaking ownership information.
pub async fn require_owner(
    identity: &Identity,
    resource: OwnedResource,
    resolver: &dyn OwnershipResolver,
) -> Result<(), AuthError> {
    if identity.role.is_admin() {
        return Ok(());
    }

    match resolver.owner_of(resource).await? {
        None => Err(AuthError::NotFound(resource.kind())),
        Some(owner) if owner == identity.id => Ok(()),
        Some(_) => Err(AuthError::NotOwner),
    }
}

/// Safety rules for admin block/unblock of a target identity.
///
/// Admin accounts can never be blocked or unblocked through this pathway,
/// and a no-op transition is reported as a failure so the audit trail
/// reflects the attempt.
pub fn guard_status_change(target: &Identity, new_status: UserStatus) -> Result<(), AuthError> {
    if target.role.is_admin() {
        return Err(AuthError::ProtectedAccount);
    }

    if target.status == new_status {
        let msg = match new_status {
            UserStatus::Blocked => "User is already blocked",
            UserStatus::Active => "User is already active",
        };
        return Err(AuthError::NoStateChange(msg.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use portal_core::{PageRequest, StoreError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::UserCounts;

    fn identity(id: i64, role: Role, status: UserStatus) -> Identity {
        Identity {
            id: UserId::new(id),
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            role,
            status,
            created_at: Utc::now(),
        }
    }

    struct FakeCredentials {
        users: Mutex<HashMap<i64, Identity>>,
    }

    impl FakeCredentials {
        fn with(users: Vec<Identity>) -> Self {
            Self {
                users: Mutex::new(users.into_iter().map(|u| (u.id.as_i64(), u)).collect()),
            }
        }

        fn set(&self, user: Identity) {
            self.users.lock().unwrap().insert(user.id.as_i64(), user);
        }
    }

    #[async_trait]
    impl CredentialStore for FakeCredentials {
        async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
            Ok(self.users.lock().unwrap().get(&id.as_i64()).cloned())
        }

        async fn set_status(&self, id: UserId, status: UserStatus) -> StoreResult<u64> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&id.as_i64()) {
                Some(u) => {
                    u.status = status;
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn list(
            &self,
            _search: Option<&str>,
            _page: PageRequest,
        ) -> StoreResult<(Vec<Identity>, u64)> {
            unimplemented!("not used in these tests")
        }

        async fn counts(&self) -> StoreResult<UserCounts> {
            unimplemented!("not used in these tests")
        }
    }

    struct FakeOwners {
        owners: HashMap<OwnedResource, UserId>,
    }

    #[async_trait]
    impl OwnershipResolver for FakeOwners {
        async fn owner_of(&self, resource: OwnedResource) -> StoreResult<Option<UserId>> {
            Ok(self.owners.get(&resource).copied())
        }
    }

    struct FailingOwners;

    #[async_trait]
    impl OwnershipResolver for FailingOwners {
        async fn owner_of(&self, _resource: OwnedResource) -> StoreResult<Option<UserId>> {
            Err(StoreError::unavailable("connection refused"))
        }
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_lookup() {
        let store = FakeCredentials::with(vec![]);
        let tokens = TokenService::with_default_ttl(b"s");

        let err = authenticate(None, &tokens, &store).await.unwrap_err();
        assert_eq!(err, AuthError::TokenMissing);
    }

    #[tokio::test]
    async fn valid_token_for_blocked_identity_is_rejected() {
        let user = identity(7, Role::User, UserStatus::Active);
        let store = FakeCredentials::with(vec![user.clone()]);
        let tokens = TokenService::with_default_ttl(b"s");

        // Token issued while the account was active...
        let token = tokens.issue(&user).unwrap();

        // ...then the account is blocked. The unexpired token must now fail.
        let mut blocked = user;
        blocked.status = UserStatus::Blocked;
        store.set(blocked);

        let err = authenticate(Some(&token), &tokens, &store)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AccountBlocked);
    }

    #[tokio::test]
    async fn token_for_deleted_identity_is_account_not_found() {
        let user = identity(7, Role::User, UserStatus::Active);
        let tokens = TokenService::with_default_ttl(b"s");
        let token = tokens.issue(&user).unwrap();

        let store = FakeCredentials::with(vec![]);
        let err = authenticate(Some(&token), &tokens, &store)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AccountNotFound);
    }

    #[tokio::test]
    async fn stale_role_claim_is_overridden_by_store() {
        let user = identity(7, Role::Admin, UserStatus::Active);
        let store = FakeCredentials::with(vec![user.clone()]);
        let tokens = TokenService::with_default_ttl(b"s");
        let token = tokens.issue(&user).unwrap();

        // Demote after issuance; the token still says admin.
        let mut demoted = user;
        demoted.role = Role::User;
        store.set(demoted);

        let resolved = authenticate(Some(&token), &tokens, &store).await.unwrap();
        assert_eq!(resolved.role, Role::User);
    }

    #[test]
    fn role_check_reports_required_and_actual() {
        let user = identity(1, Role::User, UserStatus::Active);

        assert!(require_role(&user, &[Role::User, Role::Admin]).is_ok());

        let err = require_role(&user, &[Role::Admin]).unwrap_err();
        assert_eq!(
            err,
            AuthError::InsufficientRole {
                required: vec![Role::Admin],
                actual: Role::User,
            }
        );
    }

    #[tokio::test]
    async fn non_owner_is_denied_and_owner_allowed() {
        let owner = identity(7, Role::User, UserStatus::Active);
        let intruder = identity(9, Role::User, UserStatus::Active);
        let resource = OwnedResource::Project(ProjectId::new(42));
        let resolver = FakeOwners {
            owners: HashMap::from([(resource, UserId::new(7))]),
        };

        assert!(require_owner(&owner, resource, &resolver).await.is_ok());
        assert_eq!(
            require_owner(&intruder, resource, &resolver)
                .await
                .unwrap_err(),
            AuthError::NotOwner
        );
    }

    #[tokio::test]
    async fn admin_bypasses_ownership_without_lookup() {
        let admin = identity(1, Role::Admin, UserStatus::Active);
        let resource = OwnedResource::Project(ProjectId::new(42));

        // The resolver fails on contact; the bypass must not reach it.
        assert!(require_owner(&admin, resource, &FailingOwners).await.is_ok());
    }

    #[tokio::test]
    async fn missing_resource_is_not_found_not_not_owner() {
        let user = identity(9, Role::User, UserStatus::Active);
        let resolver = FakeOwners {
            owners: HashMap::new(),
        };

        let err = require_owner(&user, OwnedResource::Task(TaskId::new(5)), &resolver)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotFound("Task"));
    }

    #[test]
    fn admin_target_is_protected_even_when_transition_would_be_valid() {
        let admin = identity(1, Role::Admin, UserStatus::Active);
        assert_eq!(
            guard_status_change(&admin, UserStatus::Blocked).unwrap_err(),
            AuthError::ProtectedAccount
        );
        // Protection also wins over the no-state-change report.
        assert_eq!(
            guard_status_change(&admin, UserStatus::Active).unwrap_err(),
            AuthError::ProtectedAccount
        );
    }

    #[test]
    fn noop_transitions_are_reported() {
        let active = identity(2, Role::User, UserStatus::Active);
        let blocked = identity(3, Role::User, UserStatus::Blocked);

        assert!(matches!(
            guard_status_change(&active, UserStatus::Active),
            Err(AuthError::NoStateChange(_))
        ));
        assert!(matches!(
            guard_status_change(&blocked, UserStatus::Blocked),
            Err(AuthError::NoStateChange(_))
        ));
        assert!(guard_status_change(&active, UserStatus::Blocked).is_ok());
        assert!(guard_status_change(&blocked, UserStatus::Active).is_ok());
    }
}
