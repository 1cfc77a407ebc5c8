//! Postgres-backed credential and audit stores.
//!
//! Schema (see `migrations/`):
//!   users      (id BIGSERIAL, email TEXT UNIQUE, password_hash TEXT,
//!               role TEXT, status TEXT, created_at TIMESTAMPTZ)
//!   audit_logs (id BIGSERIAL, actor_user_id BIGINT NULL, action TEXT,
//!               entity_type TEXT NULL, entity_id BIGINT NULL, result TEXT,
//!               ip TEXT NULL, user_agent TEXT NULL, details JSONB NULL,
//!               ts TIMESTAMPTZ)
//!
//! Role, status, and result are stored as their wire strings and parsed on
//! the way out; a row carrying an unknown tag is a query error, not a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};

use portal_audit::{
    ActivityCounts, AuditEvent, AuditFilter, AuditQuery, AuditRecord, AuditRecorder,
};
use portal_auth::{CredentialStore, Identity, UserCounts, UserStatus};
use portal_core::{PageRequest, StoreError, StoreResult, UserId};

fn db_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::unavailable(e.to_string())
        }
        other => StoreError::query(other.to_string()),
    }
}

fn parse_tag<T: core::str::FromStr>(column: &str, raw: &str) -> StoreResult<T> {
    raw.parse()
        .map_err(|_| StoreError::query(format!("unrecognized {column} value: {raw}")))
}

// ─── Credentials ────────────────────────────────────────────────────────────

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn identity_from_row(row: &PgRow) -> StoreResult<Identity> {
    let role: String = row.try_get("role").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(Identity {
        id: UserId::new(row.try_get("id").map_err(db_err)?),
        email: row.try_get("email").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        role: parse_tag("role", &role)?,
        status: parse_tag("status", &status)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

const SELECT_IDENTITY: &str =
    "SELECT id, email, password_hash, role, status, created_at FROM users";

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query(&format!("{SELECT_IDENTITY} WHERE LOWER(email) = LOWER($1)"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
        let row = sqlx::query(&format!("{SELECT_IDENTITY} WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> StoreResult<u64> {
        let done = sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected())
    }

    async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<(Vec<Identity>, u64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) AS n FROM users");
        let mut select = QueryBuilder::new(SELECT_IDENTITY);
        if let Some(needle) = search {
            let pattern = format!("%{needle}%");
            for builder in [&mut count, &mut select] {
                builder.push(" WHERE email ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR role ILIKE ");
                builder.push_bind(pattern.clone());
            }
        }
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(page.limit as i64);
        select.push(" OFFSET ");
        select.push_bind(page.offset() as i64);

        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_get("n")
            .map_err(db_err)?;

        let rows = select.build().fetch_all(&self.pool).await.map_err(db_err)?;
        let identities = rows
            .iter()
            .map(identity_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((identities, total as u64))
    }

    async fn counts(&self) -> StoreResult<UserCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'blocked') AS blocked,
                COUNT(*) FILTER (WHERE role = 'admin') AS admins,
                COUNT(*) FILTER (WHERE role = 'user') AS regular
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(UserCounts {
            total_users: row.try_get::<i64, _>("total").map_err(db_err)? as u64,
            active_users: row.try_get::<i64, _>("active").map_err(db_err)? as u64,
            blocked_users: row.try_get::<i64, _>("blocked").map_err(db_err)? as u64,
            admin_users: row.try_get::<i64, _>("admins").map_err(db_err)? as u64,
            regular_users: row.try_get::<i64, _>("regular").map_err(db_err)? as u64,
        })
    }
}

// ─── Audit ledger ───────────────────────────────────────────────────────────

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> StoreResult<AuditRecord> {
    let action: String = row.try_get("action").map_err(db_err)?;
    let entity_type: Option<String> = row.try_get("entity_type").map_err(db_err)?;
    let result: String = row.try_get("result").map_err(db_err)?;

    let action = serde_json::from_value(serde_json::Value::String(action.clone()))
        .map_err(|_| StoreError::query(format!("unrecognized action value: {action}")))?;
    let entity_type = entity_type
        .map(|t| {
            serde_json::from_value(serde_json::Value::String(t.clone()))
                .map_err(|_| StoreError::query(format!("unrecognized entity_type value: {t}")))
        })
        .transpose()?;
    let result = serde_json::from_value(serde_json::Value::String(result.clone()))
        .map_err(|_| StoreError::query(format!("unrecognized result value: {result}")))?;

    Ok(AuditRecord {
        id: row.try_get::<i64, _>("id").map_err(db_err)? as u64,
        event: AuditEvent {
            at: row.try_get("ts").map_err(db_err)?,
            actor: row
                .try_get::<Option<i64>, _>("actor_user_id")
                .map_err(db_err)?
                .map(UserId::new),
            action,
            entity_type,
            entity_id: row.try_get("entity_id").map_err(db_err)?,
            result,
            ip: row.try_get("ip").map_err(db_err)?,
            user_agent: row.try_get("user_agent").map_err(db_err)?,
            details: row.try_get("details").map_err(db_err)?,
        },
    })
}

const SELECT_RECORD: &str = "SELECT id, actor_user_id, action, entity_type, entity_id, result, \
                             ip, user_agent, details, ts FROM audit_logs";

fn push_filter(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &AuditFilter) {
    builder.push(" WHERE TRUE");
    if let Some(needle) = &filter.action_contains {
        builder.push(" AND action LIKE ");
        builder.push_bind(format!("%{needle}%"));
    }
    if let Some(actor) = filter.actor {
        builder.push(" AND actor_user_id = ");
        builder.push_bind(actor.as_i64());
    }
    if let Some(kind) = filter.entity_type {
        builder.push(" AND entity_type = ");
        builder.push_bind(kind.as_str());
    }
    if let Some(result) = filter.result {
        builder.push(" AND result = ");
        builder.push_bind(match result {
            portal_audit::AuditResult::Success => "success",
            portal_audit::AuditResult::Fail => "fail",
        });
    }
    if let Some(from) = filter.from {
        builder.push(" AND ts >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND ts <= ");
        builder.push_bind(to);
    }
}

#[async_trait]
impl AuditRecorder for PostgresAuditLog {
    async fn record(&self, event: AuditEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (actor_user_id, action, entity_type, entity_id, result, ip, user_agent, details, ts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.actor.map(|a| a.as_i64()))
        .bind(event.action.as_str())
        .bind(event.entity_type.map(|t| t.as_str()))
        .bind(event.entity_id)
        .bind(match event.result {
            portal_audit::AuditResult::Success => "success",
            portal_audit::AuditResult::Fail => "fail",
        })
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(&event.details)
        .bind(event.at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl AuditQuery for PostgresAuditLog {
    async fn list(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<AuditRecord>, u64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) AS n FROM audit_logs");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_get("n")
            .map_err(db_err)?;

        let mut select = QueryBuilder::new(SELECT_RECORD);
        push_filter(&mut select, filter);
        select.push(" ORDER BY ts DESC, id DESC LIMIT ");
        select.push_bind(page.limit as i64);
        select.push(" OFFSET ");
        select.push_bind(page.offset() as i64);

        let rows = select.build().fetch_all(&self.pool).await.map_err(db_err)?;
        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((records, total as u64))
    }

    async fn recent_for_actor(&self, actor: UserId, limit: u64) -> StoreResult<Vec<AuditRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_RECORD} WHERE actor_user_id = $1 ORDER BY ts DESC, id DESC LIMIT $2"
        ))
        .bind(actor.as_i64())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn login_count(&self, actor: UserId) -> StoreResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM audit_logs WHERE actor_user_id = $1 AND action = 'login.success'",
        )
        .bind(actor.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.try_get::<i64, _>("n").map_err(db_err)? as u64)
    }

    async fn last_login(&self, actor: UserId) -> StoreResult<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(ts) AS last FROM audit_logs WHERE actor_user_id = $1 AND action = 'login.success'",
        )
        .bind(actor.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.try_get("last").map_err(db_err)
    }

    async fn activity_counts(&self) -> StoreResult<ActivityCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE action = 'login.success') AS ok_logins,
                COUNT(*) FILTER (WHERE action = 'login.fail') AS bad_logins,
                COUNT(*) FILTER (WHERE ts >= NOW() - INTERVAL '24 hours') AS recent
            FROM audit_logs
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(ActivityCounts {
            total_logs: row.try_get::<i64, _>("total").map_err(db_err)? as u64,
            successful_logins: row.try_get::<i64, _>("ok_logins").map_err(db_err)? as u64,
            failed_logins: row.try_get::<i64, _>("bad_logins").map_err(db_err)? as u64,
            last_24h_activity: row.try_get::<i64, _>("recent").map_err(db_err)? as u64,
        })
    }
}
