//! `portal-infra` — store implementations.
//!
//! In-memory stores for development and tests, plus Postgres-backed
//! credential and audit stores behind the `postgres` feature. Traits live in
//! the crates that own the concern (`portal-auth`, `portal-audit`, and the
//! workspace contract here).

pub mod audit_log;
pub mod credentials;
pub mod rate_limit;
pub mod workspace;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use audit_log::InMemoryAuditLog;
pub use credentials::InMemoryCredentialStore;
pub use rate_limit::FixedWindowRateLimiter;
pub use workspace::{
    InMemoryWorkspaceStore, NewProject, NewTask, Project, ProjectSummary, Task, TaskStatus,
    UpdateProject, UpdateTask, WorkspaceCounts, WorkspaceStore,
};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresAuditLog, PostgresCredentialStore};
