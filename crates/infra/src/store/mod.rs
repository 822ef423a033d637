//! Persistence: one repository trait per entity, with an in-memory
//! implementation (dev/tests) and a Postgres implementation.

pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use repository::{PostRepository, StoreError, UserRepository, VoteRepository};
