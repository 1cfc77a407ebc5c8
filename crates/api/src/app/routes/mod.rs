use axum::Router;

pub mod admin;
pub mod auth;
pub mod projects;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/projects", projects::router())
        .nest("/api/admin", admin::router())
}
