//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and token-service wiring behind trait objects
//! - `routes/`: HTTP routes + handlers (one file per surface)
//! - `dto.rs`: request DTOs, validation, and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };

    // Protected routes: bearer token + live-account check on every request.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/api/auth/login", post(routes::auth::login))
        .merge(protected)
        .layer(Extension(services))
}
