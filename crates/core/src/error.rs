//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// ownership, existence, uniqueness). Storage and transport concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed email, empty password).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The actor is authenticated but may not touch this entity.
    #[error("{0}")]
    Forbidden(String),

    /// A uniqueness rule was violated on registration (e.g. duplicate email).
    #[error("{0}")]
    AlreadyExists(String),

    /// The requested state transition conflicts with current state
    /// (e.g. voting twice on the same post).
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_the_message_verbatim() {
        let err = DomainError::not_found("Post with id: 7 is not found");
        assert_eq!(err.to_string(), "Post with id: 7 is not found");

        let err = DomainError::validation("password must not be empty");
        assert_eq!(err.to_string(), "validation failed: password must not be empty");
    }
}
