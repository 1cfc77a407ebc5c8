//! In-memory audit ledger.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use portal_audit::{
    ActivityCounts, AuditAction, AuditEvent, AuditFilter, AuditQuery, AuditRecord, AuditRecorder,
    AuditResult,
};
use portal_core::{PageRequest, StoreResult, UserId};

/// Append-only in-memory ledger for development and tests.
#[derive(Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
    next_id: AtomicU64,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of every record, oldest first (test assertions).
    pub fn all(&self) -> Vec<AuditRecord> {
        self.records.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditRecorder for InMemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> StoreResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.write().unwrap().push(AuditRecord { id, event });
        Ok(())
    }
}

#[async_trait]
impl AuditQuery for InMemoryAuditLog {
    async fn list(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<AuditRecord>, u64)> {
        let mut matched: Vec<AuditRecord> = self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(&r.event))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.event.at.cmp(&a.event.at).then(b.id.cmp(&a.id)));

        let total = matched.len() as u64;
        let start = (page.offset() as usize).min(matched.len());
        let end = (start + page.limit as usize).min(matched.len());
        Ok((matched[start..end].to_vec(), total))
    }

    async fn recent_for_actor(&self, actor: UserId, limit: u64) -> StoreResult<Vec<AuditRecord>> {
        let mut matched: Vec<AuditRecord> = self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.event.actor == Some(actor))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.event.at.cmp(&a.event.at).then(b.id.cmp(&a.id)));
        matched.truncate(limit as usize);
        Ok(matched)
    }

    async fn login_count(&self, actor: UserId) -> StoreResult<u64> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| {
                r.event.actor == Some(actor) && r.event.action == AuditAction::LoginSuccess
            })
            .count() as u64)
    }

    async fn last_login(&self, actor: UserId) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| {
                r.event.actor == Some(actor) && r.event.action == AuditAction::LoginSuccess
            })
            .map(|r| r.event.at)
            .max())
    }

    async fn activity_counts(&self) -> StoreResult<ActivityCounts> {
        let records = self.records.read().unwrap();
        let cutoff = Utc::now() - Duration::hours(24);

        let mut counts = ActivityCounts {
            total_logs: records.len() as u64,
            ..ActivityCounts::default()
        };
        for record in records.iter() {
            match record.event.action {
                AuditAction::LoginSuccess => counts.successful_logins += 1,
                AuditAction::LoginFail => counts.failed_logins += 1,
                _ => {}
            }
            if record.event.at >= cutoff {
                counts.last_24h_activity += 1;
            }
        }
        Ok(counts)
    }
}
