//! `postboard-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers and the domain error model used by the `users` and
//! `posts` crates.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{PostId, UserId};
