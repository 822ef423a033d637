use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use postboard_auth::TokenService;
use postboard_infra::{StoreError, UserRepository};

use crate::app::errors;
use crate::context::CurrentUser;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserRepository>,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// Missing or malformed header, bad or expired token, or a token whose
    /// user no longer exists. Deliberately indistinguishable to the client.
    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolve the bearer token in `headers` to a stored user.
pub async fn authenticate(
    state: &AuthState,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<CurrentUser, AuthenticationError> {
    let token = extract_bearer(headers).ok_or(AuthenticationError::InvalidCredentials)?;

    let email = state
        .tokens
        .verify(token, now)
        .map_err(|_e| AuthenticationError::InvalidCredentials)?;

    match state.users.find_by_email(&email).await? {
        Some(user) => Ok(CurrentUser::new(user)),
        None => {
            tracing::debug!("token identity does not match any user");
            Err(AuthenticationError::InvalidCredentials)
        }
    }
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let current = match authenticate(&state, req.headers(), Utc::now()).await {
        Ok(current) => current,
        Err(e) => return errors::authentication_error_to_response(e),
    };

    req.extensions_mut().insert(current);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token)
}
