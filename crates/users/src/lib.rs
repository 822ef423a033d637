//! Users domain module (registration, identity, self-service rules).
//!
//! This crate contains business rules for user accounts, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage, no hashing).

pub mod email;
pub mod user;

pub use email::Email;
pub use user::{Credentials, NewUser, User, UserChanges};
