//! Recorder and query contracts (implemented by `portal-infra`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use portal_core::{PageRequest, StoreResult, UserId};

use crate::{AuditEvent, AuditFilter, AuditRecord};

/// Append an event to the ledger.
///
/// Implementations persist exactly what they are given; they never update or
/// delete. Callers on the request path should go through
/// [`record_best_effort`] so a write failure cannot alter the primary
/// operation's outcome.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    async fn record(&self, event: AuditEvent) -> StoreResult<()>;
}

/// Read side of the ledger, for the admin surface.
#[async_trait]
pub trait AuditQuery: Send + Sync {
    /// Filtered listing, newest first.
    async fn list(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<AuditRecord>, u64)>;

    /// Most recent events for one actor, newest first.
    async fn recent_for_actor(&self, actor: UserId, limit: u64) -> StoreResult<Vec<AuditRecord>>;

    /// Number of successful logins recorded for one actor.
    async fn login_count(&self, actor: UserId) -> StoreResult<u64>;

    /// Timestamp of the actor's most recent successful login.
    async fn last_login(&self, actor: UserId) -> StoreResult<Option<DateTime<Utc>>>;

    /// Ledger-wide aggregates for the statistics surface.
    async fn activity_counts(&self) -> StoreResult<ActivityCounts>;
}

/// Ledger-wide activity aggregates.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityCounts {
    pub total_logs: u64,
    pub successful_logins: u64,
    pub failed_logins: u64,
    pub last_24h_activity: u64,
}

/// Record `event`, swallowing any failure.
///
/// Audit is best-effort relative to the primary operation: a write failure
/// is logged operationally and then dropped. It must never convert a
/// successful operation into a reported failure, nor vice versa.
pub async fn record_best_effort(recorder: &dyn AuditRecorder, event: AuditEvent) {
    let action = event.action;
    if let Err(e) = recorder.record(event).await {
        tracing::warn!(action = action.as_str(), "audit write failed: {e}");
    }
}
