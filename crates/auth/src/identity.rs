//! Identity model.
//!
//! An identity is created by registration (seeded externally as far as this
//! core is concerned), mutated only by admin block/unblock, and never
//! deleted.

use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use portal_core::UserId;

use crate::Role;

/// Account liveness. Blocked identities fail authentication on the next
/// request even while holding an unexpired token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "blocked" => Ok(UserStatus::Blocked),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A full identity record as held by the credential store.
///
/// Deliberately not `Serialize`: the password hash must never travel to a
/// client. Use [`Identity::summary`] for anything response-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    /// Unique, matched case-insensitively.
    pub email: String,
    /// Argon2 PHC string; irreversible.
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Client-safe view of the identity.
    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            status: self.status,
        }
    }
}

/// The `{id, email, role, status}` projection handed to downstream handlers
/// and embedded in token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
}
