//! Environment-driven configuration.

use chrono::Duration;

use portal_auth::token::DEFAULT_TTL_HOURS;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HS256 signing secret shared by issuance and verification.
    pub jwt_secret: String,
    /// Validity window for issued tokens.
    pub token_ttl: Duration,
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind: String,
    /// When true (PORTAL_ENV=development), 500 responses carry the
    /// underlying store error text instead of a generic message.
    pub dev_errors: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let token_ttl = std::env::var("PORTAL_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .map(Duration::hours)
            .unwrap_or_else(|| Duration::hours(DEFAULT_TTL_HOURS));

        let bind = std::env::var("PORTAL_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let dev_errors = std::env::var("PORTAL_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        Self {
            jwt_secret,
            token_ttl,
            bind,
            dev_errors,
        }
    }
}
