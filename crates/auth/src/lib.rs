//! `postboard-auth`: credentials and bearer tokens.
//!
//! This crate is intentionally decoupled from HTTP and storage: it signs and
//! verifies tokens and hashes passwords. Resolving a token to a stored user is
//! the API layer's job.

pub mod claims;
pub mod password;
pub mod token;

pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, PasswordHasher};
pub use token::{AuthError, SigningAlgorithm, TokenService};
