use std::sync::Arc;

use anyhow::Context;

use portal_api::app::services::{self, AppServices};
use portal_api::config::AppConfig;
use portal_auth::{Role, password};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    portal_observability::init();

    let config = AppConfig::from_env();

    let services = build_backend(&config).await;

    let app = portal_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn build_backend(config: &AppConfig) -> Arc<AppServices> {
    let (services, backend) = services::build_services(config);
    seed_admin(&backend);
    services
}

#[cfg(feature = "postgres")]
async fn build_backend(config: &AppConfig) -> Arc<AppServices> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            tracing::info!("using postgres-backed credential and audit stores");
            services::build_postgres_services(config, pool)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; falling back to in-memory stores");
            let (services, backend) = services::build_services(config);
            seed_admin(&backend);
            services
        }
    }
}

/// The in-memory store starts empty and there is no registration endpoint,
/// so seed a bootstrap admin account.
fn seed_admin(backend: &services::InMemoryBackend) {
    let email =
        std::env::var("PORTAL_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let password =
        std::env::var("PORTAL_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

    match password::hash(&password) {
        Ok(hash) => {
            let admin = backend.credentials.insert(email, hash, Role::Admin);
            tracing::info!(email = %admin.email, "seeded bootstrap admin");
        }
        Err(e) => {
            tracing::error!("failed to hash bootstrap admin password: {e}");
        }
    }
}
