//! Posts domain module (posts, ownership, listing rules, votes).
//!
//! Pure domain logic: no IO, no HTTP, no storage.

pub mod post;
pub mod query;
pub mod vote;

pub use post::{Post, PostDraft, VotedPost};
pub use query::{PostQuery, DEFAULT_LIMIT};
pub use vote::{Vote, VoteAction, VoteDirection};
