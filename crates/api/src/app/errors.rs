use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use postboard_auth::AuthError;
use postboard_core::DomainError;

use crate::app::services::ServiceError;
use crate::middleware::AuthenticationError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Auth(AuthError::InvalidCredentials) => unauthorized(),
        other => internal_error(other),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        DomainError::AlreadyExists(msg) => json_error(StatusCode::NOT_ACCEPTABLE, "already_exists", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn authentication_error_to_response(err: AuthenticationError) -> axum::response::Response {
    match err {
        AuthenticationError::InvalidCredentials => unauthorized(),
        AuthenticationError::Store(e) => internal_error(e),
    }
}

/// Malformed body, query string, form or path parameter.
pub fn rejection_to_response(rejection: impl core::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", rejection.to_string())
}

pub fn unauthorized() -> axum::response::Response {
    let mut response = json_error(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        AuthError::InvalidCredentials.to_string(),
    );
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
    response
}

fn internal_error(err: impl core::fmt::Display) -> axum::response::Response {
    tracing::error!(error = %err, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    detail: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "detail": detail.into(),
        })),
    )
        .into_response()
}
