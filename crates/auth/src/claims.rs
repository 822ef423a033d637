use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bearer token claims.
///
/// `user_email` is the identity claim; `exp` is the expiry as seconds since
/// the Unix epoch. Tokens are not stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    pub exp: i64,
}

impl TokenClaims {
    pub fn new(user_email: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_email: Some(user_email.into()),
            exp: expires_at.timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token carries no identity claim")]
    MissingIdentity,
}

/// Deterministically validate decoded claims against `now`.
///
/// Note: this validates the *claims* only. Signature verification and decoding
/// happen in [`crate::TokenService::verify`]. A token is still valid during the
/// second named by `exp` and rejected from the next one on.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<&str, TokenValidationError> {
    if now.timestamp() > claims.exp {
        return Err(TokenValidationError::Expired);
    }
    match claims.user_email.as_deref() {
        Some(email) if !email.is_empty() => Ok(email),
        _ => Err(TokenValidationError::MissingIdentity),
    }
}
