//! `portal-audit` — tamper-evident activity ledger.
//!
//! Event model plus the recorder and query contracts. Records are write-once:
//! nothing in this crate (or its implementors) updates or deletes an event,
//! and a failed write never aborts the operation that triggered it.

pub mod event;
pub mod filter;
pub mod recorder;

pub use event::{AuditAction, AuditEvent, AuditRecord, AuditResult, EntityKind};
pub use filter::AuditFilter;
pub use recorder::{record_best_effort, ActivityCounts, AuditQuery, AuditRecorder};
