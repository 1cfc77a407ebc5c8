//! Project and task endpoints.
//!
//! Every handler walks the same gate order: role check, then ownership
//! (admins bypass), then the store operation. Single-item reads and all
//! mutations are audited.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use portal_audit::{AuditAction, AuditEvent, AuditResult, EntityKind};
use portal_auth::{AuthError, OwnedResource, Role, require_owner, require_role};
use portal_core::{ProjectId, TaskId};
use portal_infra::{NewProject, NewTask, UpdateProject, UpdateTask};

use crate::app::{dto, errors, services::AppServices};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:id/tasks", get(list_tasks).post(create_task))
        .route(
            "/:id/tasks/:task_id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

const ANY_ROLE: &[Role] = &[Role::User, Role::Admin];

fn fail(services: &AppServices, err: AuthError) -> axum::response::Response {
    errors::auth_error_response(&err, services.dev_errors)
}

// ─── Projects ───────────────────────────────────────────────────────────────

/// GET /api/projects - own projects; admins see everything.
pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }

    let owner = if identity.role.is_admin() {
        None
    } else {
        Some(identity.id)
    };

    match services.workspace.list_projects(owner).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => fail(&services, e.into()),
    }
}

/// POST /api/projects
pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<dto::ProjectRequest>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }

    let (name, description) = match body.validate() {
        Ok(fields) => fields,
        Err(details) => return errors::validation_error(details),
    };

    let project = match services
        .workspace
        .create_project(NewProject {
            name,
            description,
            owner_id: identity.id,
        })
        .await
    {
        Ok(project) => project,
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::ProjectCreate, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Project, project.id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::CREATED, Json(project)).into_response()
}

/// GET /api/projects/:id
pub async fn get_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<ProjectId>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Project(id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    let project = match services.workspace.get_project(id).await {
        Ok(Some(project)) => project,
        Ok(None) => return fail(&services, AuthError::NotFound("Project")),
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::ProjectView, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Project, id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::OK, Json(project)).into_response()
}

/// PUT /api/projects/:id
pub async fn update_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<ProjectId>,
    Json(body): Json<dto::ProjectRequest>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Project(id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    let (name, description) = match body.validate() {
        Ok(fields) => fields,
        Err(details) => return errors::validation_error(details),
    };

    let project = match services
        .workspace
        .update_project(id, UpdateProject { name, description })
        .await
    {
        Ok(Some(project)) => project,
        Ok(None) => return fail(&services, AuthError::NotFound("Project")),
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::ProjectUpdate, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Project, id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::OK, Json(project)).into_response()
}

/// DELETE /api/projects/:id - also removes the project's tasks.
pub async fn delete_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<ProjectId>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Project(id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    match services.workspace.delete_project(id).await {
        Ok(true) => {}
        Ok(false) => return fail(&services, AuthError::NotFound("Project")),
        Err(e) => return fail(&services, e.into()),
    }

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::ProjectDelete, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Project, id.as_i64())
                .source(ip, ua),
        )
        .await;

    (
        StatusCode::OK,
        Json(json!({ "message": "Project deleted" })),
    )
        .into_response()
}

// ─── Tasks ──────────────────────────────────────────────────────────────────

/// GET /api/projects/:id/tasks - gated on ownership of the parent project.
pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<ProjectId>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Project(id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    match services.workspace.list_tasks(id).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => fail(&services, e.into()),
    }
}

/// POST /api/projects/:id/tasks
pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<ProjectId>,
    Json(body): Json<dto::TaskRequest>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Project(id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    let (title, description, status) = match body.validate() {
        Ok(fields) => fields,
        Err(details) => return errors::validation_error(details),
    };

    let task = match services
        .workspace
        .create_task(
            id,
            NewTask {
                title,
                description,
                status,
            },
        )
        .await
    {
        Ok(task) => task,
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::TaskCreate, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Task, task.id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::CREATED, Json(task)).into_response()
}

/// GET /api/projects/:id/tasks/:task_id
pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, task_id)): Path<(ProjectId, TaskId)>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Task(task_id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    let task = match services.workspace.get_task(id, task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => return fail(&services, AuthError::NotFound("Task")),
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::TaskView, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Task, task_id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::OK, Json(task)).into_response()
}

/// PUT /api/projects/:id/tasks/:task_id
pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, task_id)): Path<(ProjectId, TaskId)>,
    Json(body): Json<dto::TaskRequest>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Task(task_id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    let (title, description, status) = match body.validate() {
        Ok(fields) => fields,
        Err(details) => return errors::validation_error(details),
    };

    let task = match services
        .workspace
        .update_task(
            id,
            task_id,
            UpdateTask {
                title,
                description,
                status,
            },
        )
        .await
    {
        Ok(Some(task)) => task,
        Ok(None) => return fail(&services, AuthError::NotFound("Task")),
        Err(e) => return fail(&services, e.into()),
    };

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::TaskUpdate, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Task, task_id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::OK, Json(task)).into_response()
}

/// DELETE /api/projects/:id/tasks/:task_id
pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, task_id)): Path<(ProjectId, TaskId)>,
) -> axum::response::Response {
    let identity = ctx.identity();
    if let Err(e) = require_role(identity, ANY_ROLE) {
        return fail(&services, e);
    }
    if let Err(e) = require_owner(
        identity,
        OwnedResource::Task(task_id),
        services.owners.as_ref(),
    )
    .await
    {
        return fail(&services, e);
    }

    match services.workspace.delete_task(id, task_id).await {
        Ok(true) => {}
        Ok(false) => return fail(&services, AuthError::NotFound("Task")),
        Err(e) => return fail(&services, e.into()),
    }

    let (ip, ua) = ctx.source();
    services
        .audit(
            AuditEvent::now(AuditAction::TaskDelete, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::Task, task_id.as_i64())
                .source(ip, ua),
        )
        .await;

    (StatusCode::OK, Json(json!({ "message": "Task deleted" }))).into_response()
}
