//! Login and session endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use portal_audit::{AuditAction, AuditEvent, AuditResult, EntityKind};
use portal_auth::{AuthError, RateDecision, password};

use crate::app::{dto, errors, services::AppServices};
use crate::context::AuthContext;
use crate::middleware::client_source;

pub fn router() -> Router {
    Router::new()
        .route("/profile", get(profile))
        .route("/verify", get(verify))
        .route("/logout", post(logout))
}

/// POST /api/auth/login
///
/// Rate-limited per client IP before anything else; limited attempts get a
/// 429 and are deliberately not audited (the window would flood the ledger).
/// Unknown email and wrong password produce byte-identical 401 responses.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let (ip, user_agent) = client_source(&headers);
    let rate_key = ip.clone().unwrap_or_else(|| "local".to_string());

    if services.login_limiter.check(&rate_key) == RateDecision::Limited {
        return errors::rate_limited();
    }

    let (email, password_input) = match body.validate() {
        Ok(fields) => fields,
        Err(details) => {
            services
                .audit(
                    AuditEvent::now(AuditAction::LoginFail, AuditResult::Fail)
                        .source(ip, user_agent)
                        .details(json!({ "email": body.email.as_deref(), "error": "Validation failed" })),
                )
                .await;
            return errors::validation_error(details);
        }
    };

    let identity = match services.credentials.find_by_email(email).await {
        Ok(found) => found,
        Err(e) => return errors::auth_error_response(&e.into(), services.dev_errors),
    };

    let Some(identity) = identity else {
        // Unknown email: no actor to attribute, but capture the attempt.
        services
            .audit(
                AuditEvent::now(AuditAction::LoginFail, AuditResult::Fail)
                    .source(ip, user_agent)
                    .details(json!({ "email": email, "error": "User not found" })),
            )
            .await;
        return errors::auth_error_response(&AuthError::InvalidCredentials, services.dev_errors);
    };

    if !password::verify(&identity.password_hash, password_input) {
        services
            .audit(
                AuditEvent::now(AuditAction::LoginFail, AuditResult::Fail)
                    .actor(identity.id)
                    .entity(EntityKind::User, identity.id.as_i64())
                    .source(ip, user_agent)
                    .details(json!({ "email": email, "error": "Invalid password" })),
            )
            .await;
        return errors::auth_error_response(&AuthError::InvalidCredentials, services.dev_errors);
    }

    if !identity.is_active() {
        services
            .audit(
                AuditEvent::now(AuditAction::LoginFail, AuditResult::Fail)
                    .actor(identity.id)
                    .entity(EntityKind::User, identity.id.as_i64())
                    .source(ip, user_agent)
                    .details(json!({ "email": email, "error": "Account blocked" })),
            )
            .await;
        return errors::auth_error_response(&AuthError::AccountBlocked, services.dev_errors);
    }

    let token = match services.tokens.issue(&identity) {
        Ok(token) => token,
        Err(e) => return errors::auth_error_response(&e, services.dev_errors),
    };

    services
        .audit(
            AuditEvent::now(AuditAction::LoginSuccess, AuditResult::Success)
                .actor(identity.id)
                .entity(EntityKind::User, identity.id.as_i64())
                .source(ip, user_agent),
        )
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "token": token,
            "user": dto::user_to_json(&identity),
        })),
    )
        .into_response()
}

/// GET /api/auth/profile - the caller's account plus workspace/login stats.
pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    let identity = ctx.identity();

    let stats = async {
        let project_count = services.workspace.project_count_for(identity.id).await?;
        let task_count = services.workspace.task_count_for(identity.id).await?;
        let recent = services
            .workspace
            .recent_projects_for(identity.id, 5)
            .await?;
        let login_count = services.audit_query.login_count(identity.id).await?;
        let last_login = services.audit_query.last_login(identity.id).await?;
        Ok::<_, portal_core::StoreError>(json!({
            "project_count": project_count,
            "task_count": task_count,
            "recent_projects": recent,
            "login_count": login_count,
            "last_login": last_login.map(|dt| dt.to_rfc3339()),
        }))
    }
    .await;

    match stats {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "user": dto::user_to_json(identity),
                "stats": stats,
            })),
        )
            .into_response(),
        Err(e) => errors::auth_error_response(&e.into(), services.dev_errors),
    }
}

/// GET /api/auth/verify - confirms the token resolves to a live account.
pub async fn verify(Extension(ctx): Extension<AuthContext>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "valid": true,
            "user": dto::user_to_json(ctx.identity()),
        })),
    )
        .into_response()
}

/// POST /api/auth/logout - stateless tokens, so this is a client-side
/// convention; the server just acknowledges.
pub async fn logout() -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "message": "Logged out" }))).into_response()
}
