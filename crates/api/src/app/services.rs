//! Service wiring shared by all handlers.

use std::sync::Arc;

use portal_audit::{AuditEvent, AuditQuery, AuditRecorder, record_best_effort};
use portal_auth::{CredentialStore, OwnershipResolver, RateLimiter, TokenService};
use portal_infra::{
    FixedWindowRateLimiter, InMemoryAuditLog, InMemoryCredentialStore, InMemoryWorkspaceStore,
    WorkspaceStore,
};

use crate::config::AppConfig;

/// Everything the handlers need, behind trait objects so the backing stores
/// are swappable (in-memory for dev/tests, Postgres behind the `postgres`
/// feature).
pub struct AppServices {
    pub tokens: Arc<TokenService>,
    pub credentials: Arc<dyn CredentialStore>,
    pub audit: Arc<dyn AuditRecorder>,
    pub audit_query: Arc<dyn AuditQuery>,
    pub workspace: Arc<dyn WorkspaceStore>,
    pub owners: Arc<dyn OwnershipResolver>,
    pub login_limiter: Arc<dyn RateLimiter>,
    pub dev_errors: bool,
}

impl AppServices {
    /// Record an audit event without letting a ledger failure surface into
    /// the request outcome.
    pub async fn audit(&self, event: AuditEvent) {
        record_best_effort(self.audit.as_ref(), event).await;
    }
}

/// Direct handles onto the in-memory stores, for seeding and inspection.
pub struct InMemoryBackend {
    pub credentials: Arc<InMemoryCredentialStore>,
    pub audit: Arc<InMemoryAuditLog>,
    pub workspace: Arc<InMemoryWorkspaceStore>,
}

/// Build in-memory-backed services.
pub fn build_services(config: &AppConfig) -> (Arc<AppServices>, InMemoryBackend) {
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let workspace = Arc::new(InMemoryWorkspaceStore::new());

    let services = Arc::new(AppServices {
        tokens: Arc::new(TokenService::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl,
        )),
        credentials: credentials.clone(),
        audit: audit.clone(),
        audit_query: audit.clone(),
        workspace: workspace.clone(),
        owners: workspace.clone(),
        login_limiter: Arc::new(FixedWindowRateLimiter::for_login()),
        dev_errors: config.dev_errors,
    });

    (
        services,
        InMemoryBackend {
            credentials,
            audit,
            workspace,
        },
    )
}

/// Build services with Postgres-backed credentials and audit ledger. The
/// project/task store stays in-memory; its persistence is out of scope here.
#[cfg(feature = "postgres")]
pub fn build_postgres_services(config: &AppConfig, pool: sqlx::PgPool) -> Arc<AppServices> {
    let credentials = Arc::new(portal_infra::PostgresCredentialStore::new(pool.clone()));
    let audit = Arc::new(portal_infra::PostgresAuditLog::new(pool));
    let workspace = Arc::new(InMemoryWorkspaceStore::new());

    Arc::new(AppServices {
        tokens: Arc::new(TokenService::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl,
        )),
        credentials,
        audit: audit.clone(),
        audit_query: audit,
        workspace: workspace.clone(),
        owners: workspace,
        login_limiter: Arc::new(FixedWindowRateLimiter::for_login()),
        dev_errors: config.dev_errors,
    })
}
