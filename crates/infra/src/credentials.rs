//! In-memory credential store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use portal_auth::{CredentialStore, Identity, Role, UserCounts, UserStatus};
use portal_core::{PageRequest, StoreResult, UserId};

/// Map-backed credential store for development and tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<i64, Identity>>,
    next_id: AtomicI64,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert an identity with a caller-chosen id (seeding, test fixtures).
    pub fn seed(&self, identity: Identity) {
        let id = identity.id.as_i64();
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        self.users.write().unwrap().insert(id, identity);
    }

    /// Insert a new identity with the next free id.
    pub fn insert(&self, email: String, password_hash: String, role: Role) -> Identity {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let identity = Identity {
            id: UserId::new(id),
            email,
            password_hash,
            role,
            status: UserStatus::Active,
            created_at: Utc::now(),
        };
        self.users.write().unwrap().insert(id, identity.clone());
        identity
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
        Ok(self.users.read().unwrap().get(&id.as_i64()).cloned())
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> StoreResult<u64> {
        let mut users = self.users.write().unwrap();
        match users.get_mut(&id.as_i64()) {
            Some(user) => {
                user.status = status;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Identity>, u64)> {
        let mut users: Vec<Identity> = {
            let guard = self.users.read().unwrap();
            match search {
                Some(needle) => {
                    let needle = needle.to_lowercase();
                    guard
                        .values()
                        .filter(|u| {
                            u.email.to_lowercase().contains(&needle)
                                || u.role.as_str().contains(&needle)
                        })
                        .cloned()
                        .collect()
                }
                None => guard.values().cloned().collect(),
            }
        };
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = users.len() as u64;
        let start = (page.offset() as usize).min(users.len());
        let end = (start + page.limit as usize).min(users.len());
        Ok((users[start..end].to_vec(), total))
    }

    async fn counts(&self) -> StoreResult<UserCounts> {
        let users = self.users.read().unwrap();
        let mut counts = UserCounts {
            total_users: users.len() as u64,
            ..UserCounts::default()
        };
        for user in users.values() {
            match user.status {
                UserStatus::Active => counts.active_users += 1,
                UserStatus::Blocked => counts.blocked_users += 1,
            }
            match user.role {
                Role::Admin => counts.admin_users += 1,
                Role::User => counts.regular_users += 1,
            }
        }
        Ok(counts)
    }
}
