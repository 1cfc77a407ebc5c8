use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use portal_auth::AuthError;

/// Map an auth/access error to its HTTP response.
///
/// `dev_detail` gates store-failure messages: production gets a generic
/// body, development echoes the underlying error text.
pub fn auth_error_response(err: &AuthError, dev_detail: bool) -> axum::response::Response {
    match err {
        AuthError::TokenMissing
        | AuthError::TokenExpired
        | AuthError::TokenInvalid
        | AuthError::AccountNotFound
        | AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
        }
        AuthError::AccountBlocked => {
            json_error(StatusCode::FORBIDDEN, "account_blocked", err.to_string())
        }
        AuthError::InsufficientRole { .. } | AuthError::NotOwner => {
            json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
        }
        AuthError::ProtectedAccount => {
            json_error(StatusCode::FORBIDDEN, "protected_account", err.to_string())
        }
        AuthError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        AuthError::NoStateChange(msg) => {
            json_error(StatusCode::BAD_REQUEST, "no_state_change", msg.clone())
        }
        AuthError::Store(e) => {
            tracing::error!("store failure: {e}");
            let message = if dev_detail {
                e.to_string()
            } else {
                "Internal server error".to_string()
            };
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
    }
}

pub fn rate_limited() -> axum::response::Response {
    json_error(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "Too many login attempts. Try again later.",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error(details: Vec<&'static str>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": "Validation failed",
            "details": details,
        })),
    )
        .into_response()
}
