//! Query filters for the admin log surface.

use chrono::{DateTime, Utc};

use portal_core::UserId;

use crate::{AuditEvent, AuditResult, EntityKind};

/// Conjunctive filter over ledger entries. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    /// Substring match against the action tag (e.g. `"login"` matches both
    /// `login.success` and `login.fail`).
    pub action_contains: Option<String>,
    pub actor: Option<UserId>,
    pub entity_type: Option<EntityKind>,
    pub result: Option<AuditResult>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(needle) = &self.action_contains {
            if !event.action.as_str().contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(actor) = self.actor {
            if event.actor != Some(actor) {
                return false;
            }
        }
        if let Some(kind) = self.entity_type {
            if event.entity_type != Some(kind) {
                return false;
            }
        }
        if let Some(result) = self.result {
            if event.result != result {
                return false;
            }
        }
        if let Some(from) = self.from {
            if event.at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if event.at > to {
                return false;
            }
        }
        true
    }
}
