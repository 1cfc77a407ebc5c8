//! Audit event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_core::UserId;

/// Closed set of auditable actions. The wire tags (`login.success`, ...)
/// are the ledger's public vocabulary; filters match against them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "login.success")]
    LoginSuccess,
    #[serde(rename = "login.fail")]
    LoginFail,
    #[serde(rename = "project.view")]
    ProjectView,
    #[serde(rename = "project.create")]
    ProjectCreate,
    #[serde(rename = "project.update")]
    ProjectUpdate,
    #[serde(rename = "project.delete")]
    ProjectDelete,
    #[serde(rename = "task.view")]
    TaskView,
    #[serde(rename = "task.create")]
    TaskCreate,
    #[serde(rename = "task.update")]
    TaskUpdate,
    #[serde(rename = "task.delete")]
    TaskDelete,
    #[serde(rename = "admin.user.block")]
    AdminUserBlock,
    #[serde(rename = "admin.user.unblock")]
    AdminUserUnblock,
    #[serde(rename = "admin.users.view")]
    AdminUsersView,
    #[serde(rename = "admin.logs.view")]
    AdminLogsView,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LoginSuccess => "login.success",
            AuditAction::LoginFail => "login.fail",
            AuditAction::ProjectView => "project.view",
            AuditAction::ProjectCreate => "project.create",
            AuditAction::ProjectUpdate => "project.update",
            AuditAction::ProjectDelete => "project.delete",
            AuditAction::TaskView => "task.view",
            AuditAction::TaskCreate => "task.create",
            AuditAction::TaskUpdate => "task.update",
            AuditAction::TaskDelete => "task.delete",
            AuditAction::AdminUserBlock => "admin.user.block",
            AuditAction::AdminUserUnblock => "admin.user.unblock",
            AuditAction::AdminUsersView => "admin.users.view",
            AuditAction::AdminLogsView => "admin.logs.view",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an event targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Project,
    Task,
    AdminView,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Project => "project",
            EntityKind::Task => "task",
            EntityKind::AdminView => "admin_view",
        }
    }
}

/// Outcome of the audited operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Fail,
}

/// One immutable ledger entry.
///
/// `actor` is `None` when the acting identity could not be resolved (e.g. a
/// failed login for an unknown email — the attempted email then lives in
/// `details` so enumeration attempts are still captured).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<i64>,
    pub result: AuditResult,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// Structured, opaque payload; the ledger never interprets it.
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn now(action: AuditAction, result: AuditResult) -> Self {
        Self {
            at: Utc::now(),
            actor: None,
            action,
            entity_type: None,
            entity_id: None,
            result,
            ip: None,
            user_agent: None,
            details: None,
        }
    }

    pub fn actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn entity(mut self, kind: EntityKind, id: i64) -> Self {
        self.entity_type = Some(kind);
        self.entity_id = Some(id);
        self
    }

    /// Attach the caller's network source.
    pub fn source(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip = ip;
        self.user_agent = user_agent;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A persisted event with its ledger-assigned sequence id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub id: u64,
    #[serde(flatten)]
    pub event: AuditEvent,
}
