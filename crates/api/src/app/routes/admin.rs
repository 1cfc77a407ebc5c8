//! Admin surface: user management, audit log access, and statistics.
//!
//! Every handler requires the admin role. Block/unblock goes through the
//! status-change guard, so admin accounts are untouchable and no-op
//! transitions are rejected rather than silently absorbed.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;

use portal_audit::{AuditAction, AuditEvent, AuditResult, EntityKind};
use portal_auth::{AuthError, Role, UserStatus, guard_status_change, require_role};
use portal_core::{PageInfo, PageRequest, UserId};

use crate::app::{dto, errors, services::AppServices};
use crate::context::AuthContext;

const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_LOGS_PAGE_SIZE: u64 = 50;
const USER_ACTIVITY_LIMIT: u64 = 10;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/block", put(block_user))
        .route("/users/:id/unblock", put(unblock_user))
        .route("/logs", get(list_logs))
        .route("/stats", get(stats))
        .route("/projects", get(list_all_projects))
}

fn fail(services: &AppServices, err: AuthError) -> axum::response::Response {
    errors::auth_error_response(&err, services.dev_errors)
}

// ─── Users ──────────────────────────────────────────────────────────────────

/// GET /api/admin/users?search=&page=&limit=
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, &[Role::Admin]) {
        return fail(&services, e);
    }

    let page = PageRequest::clamped(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let (users, total) = match services
        .credentials
        .list(query.search.as_deref(), page)
        .await
    {
        Ok(listed) => listed,
        Err(e) => return fail(&services, e.into()),
    };

    // Per-user rollups for the listing: owned projects and the most recent
    // successful login.
    let mut items = Vec::with_capacity(users.len());
    for user in &users {
        let enriched = async {
            let project_count = services.workspace.project_count_for(user.id).await?;
            let last_login = services.audit_query.last_login(user.id).await?;
            let mut value = dto::user_to_json(user);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("project_count".to_string(), json!(project_count));
                obj.insert(
                    "last_login".to_string(),
                    json!(last_login.map(|dt| dt.to_rfc3339())),
                );
            }
            Ok::<_, portal_core::StoreError>(value)
        }
        .await;
        match enriched {
            Ok(value) => items.push(value),
            Err(e) => return fail(&services, e.into()),
        }
    }

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::AdminUsersView, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::AdminView, 0)
                .source(ip, ua),
        )
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "items": items,
            "page": PageInfo::new(page, total),
        })),
    )
        .into_response()
}

/// GET /api/admin/users/:id - account plus recent ledger activity.
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<UserId>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, &[Role::Admin]) {
        return fail(&services, e);
    }

    let target = match services.credentials.find_by_id(id).await {
        Ok(Some(target)) => target,
        Ok(None) => return fail(&services, AuthError::NotFound("User")),
        Err(e) => return fail(&services, e.into()),
    };

    let activity = async {
        let project_count = services.workspace.project_count_for(id).await?;
        let task_count = services.workspace.task_count_for(id).await?;
        let recent_projects = services
            .workspace
            .recent_projects_for(id, USER_ACTIVITY_LIMIT)
            .await?;
        let recent = services
            .audit_query
            .recent_for_actor(id, USER_ACTIVITY_LIMIT)
            .await?;
        let login_count = services.audit_query.login_count(id).await?;
        let last_login = services.audit_query.last_login(id).await?;
        Ok::<_, portal_core::StoreError>(json!({
            "project_count": project_count,
            "task_count": task_count,
            "recent_projects": recent_projects,
            "recent_events": recent,
            "login_count": login_count,
            "last_login": last_login.map(|dt| dt.to_rfc3339()),
        }))
    }
    .await;

    let activity = match activity {
        Ok(activity) => activity,
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::AdminUsersView, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::User, id.as_i64())
                .source(ip, ua),
        )
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "user": dto::user_to_json(&target),
            "activity": activity,
        })),
    )
        .into_response()
}

/// PUT /api/admin/users/:id/block
pub async fn block_user(
    services: Extension<Arc<AppServices>>,
    ctx: Extension<AuthContext>,
    id: Path<UserId>,
) -> axum::response::Response {
    set_user_status(services, ctx, id, UserStatus::Blocked).await
}

/// PUT /api/admin/users/:id/unblock
pub async fn unblock_user(
    services: Extension<Arc<AppServices>>,
    ctx: Extension<AuthContext>,
    id: Path<UserId>,
) -> axum::response::Response {
    set_user_status(services, ctx, id, UserStatus::Active).await
}

async fn set_user_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<UserId>,
    new_status: UserStatus,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, &[Role::Admin]) {
        return fail(&services, e);
    }

    let target = match services.credentials.find_by_id(id).await {
        Ok(Some(target)) => target,
        Ok(None) => return fail(&services, AuthError::NotFound("User")),
        Err(e) => return fail(&services, e.into()),
    };

    let action = match new_status {
        UserStatus::Blocked => AuditAction::AdminUserBlock,
        UserStatus::Active => AuditAction::AdminUserUnblock,
    };
    let (ip, ua) = ctx.source();

    // Rejected transitions still land in the ledger, as failures.
    if let Err(e) = guard_status_change(&target, new_status) {
        services
            .audit(
                AuditEvent::now(action, AuditResult::Fail)
                    .actor(identity.id)
                    .entity(EntityKind::User, id.as_i64())
                    .source(ip, ua)
                    .details(json!({
                        "target_email": target.email,
                        "reason": e.to_string(),
                    })),
            )
            .await;
        return fail(&services, e);
    }

    match services.credentials.set_status(id, new_status).await {
        Ok(0) => return fail(&services, AuthError::NotFound("User")),
        Ok(_) => {}
        Err(e) => return fail(&services, e.into()),
    }

    services
        .audit(
            AuditEvent::now(action, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::User, id.as_i64())
                .source(ip, ua)
                .details(json!({
                    "target_email": target.email,
                    "previous_status": target.status,
                })),
        )
        .await;

    let mut updated = target;
    updated.status = new_status;
    (StatusCode::OK, Json(dto::user_to_json(&updated))).into_response()
}

// ─── Audit log ──────────────────────────────────────────────────────────────

/// GET /api/admin/logs - filtered, paginated ledger access.
pub async fn list_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<dto::LogsQuery>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, &[Role::Admin]) {
        return fail(&services, e);
    }

    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(details) => return errors::validation_error(details),
    };
    let page = PageRequest::clamped(query.page, query.limit, DEFAULT_LOGS_PAGE_SIZE);

    let (records, total) = match services.audit_query.list(&filter, page).await {
        Ok(listed) => listed,
        Err(e) => return fail(&services, e.into()),
    };

    // Join actor email/role where the actor still resolves; lookup misses
    // leave the fields absent rather than failing the listing.
    let mut items = Vec::with_capacity(records.len());
    for record in &records {
        let mut value = serde_json::to_value(record).unwrap_or_default();
        if let Some(actor) = record.event.actor {
            let actor_row = match services.credentials.find_by_id(actor).await {
                Ok(row) => row,
                Err(e) => return fail(&services, e.into()),
            };
            if let (Some(obj), Some(actor_row)) = (value.as_object_mut(), actor_row) {
                obj.insert("actor_email".to_string(), json!(actor_row.email));
                obj.insert("actor_role".to_string(), json!(actor_row.role));
            }
        }
        items.push(value);
    }

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::AdminLogsView, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::AdminView, 0)
                .source(ip, ua),
        )
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "items": items,
            "page": PageInfo::new(page, total),
        })),
    )
        .into_response()
}

// ─── Statistics ─────────────────────────────────────────────────────────────

/// GET /api/admin/stats - user, workspace, and ledger aggregates.
pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, &[Role::Admin]) {
        return fail(&services, e);
    }

    let gathered = async {
        let users = services.credentials.counts().await?;
        let workspace = services.workspace.counts().await?;
        let activity = services.audit_query.activity_counts().await?;
        Ok::<_, portal_core::StoreError>(json!({
            "users": users,
            "workspace": workspace,
            "activity": activity,
        }))
    }
    .await;

    match gathered {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => fail(&services, e.into()),
    }
}

// ─── Projects overview ──────────────────────────────────────────────────────

/// GET /api/admin/projects - every project with its owner's email; `search`
/// matches project name or owner email.
pub async fn list_all_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, &[Role::Admin]) {
        return fail(&services, e);
    }

    let summaries = match services.workspace.list_projects(None).await {
        Ok(summaries) => summaries,
        Err(e) => return fail(&services, e.into()),
    };

    // Enrich with owner emails, then filter; owner lookup misses degrade to
    // an absent email rather than failing the listing.
    let mut enriched = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let owner_email = match services.credentials.find_by_id(summary.project.owner_id).await {
            Ok(owner) => owner.map(|o| o.email),
            Err(e) => return fail(&services, e.into()),
        };
        enriched.push((summary, owner_email));
    }

    if let Some(needle) = query.search.as_deref().map(str::to_lowercase) {
        enriched.retain(|(summary, owner_email)| {
            summary.project.name.to_lowercase().contains(&needle)
                || owner_email
                    .as_deref()
                    .is_some_and(|email| email.to_lowercase().contains(&needle))
        });
    }

    let page = PageRequest::clamped(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let total = enriched.len() as u64;
    let start = (page.offset() as usize).min(enriched.len());
    let end = (start + page.limit as usize).min(enriched.len());

    let items: Vec<serde_json::Value> = enriched[start..end]
        .iter()
        .map(|(summary, owner_email)| {
            let mut value = serde_json::to_value(summary).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("owner_email".to_string(), json!(owner_email));
            }
            value
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "items": items,
            "page": PageInfo::new(page, total),
        })),
    )
        .into_response()
}
