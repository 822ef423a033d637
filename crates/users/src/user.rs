//! User entity and the rules around registering and changing accounts.

use chrono::{DateTime, Utc};

use postboard_core::{DomainError, DomainResult, UserId};

use crate::Email;

// ─────────────────────────────────────────────────────────────────────────────
// Entity
// ─────────────────────────────────────────────────────────────────────────────

/// A registered user as persisted.
///
/// `password_hash` is an opaque PHC string produced by the auth crate. It is
/// redacted from `Debug` output and has no serialized form.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl User {
    /// Users may only delete or update their own account.
    ///
    /// `action` is the verb used in the error detail ("delete", "update").
    pub fn ensure_self(&self, actor: UserId, action: &str) -> DomainResult<()> {
        if self.id != actor {
            return Err(DomainError::forbidden(format!("Not authorized to {action} this user")));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Validated email + plaintext password, as submitted for registration,
/// login or account update.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl Credentials {
    pub fn parse(email: &str, password: &str) -> DomainResult<Self> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(DomainError::validation("password must not be empty"));
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A user ready to be inserted (id and timestamp are assigned by the store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
}

/// Full replacement of a user's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Email,
    pub password_hash: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
