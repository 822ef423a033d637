//! Infrastructure layer: configuration and persistence adapters.

pub mod config;
pub mod store;

pub use config::{ConfigError, DatabaseSettings, Settings, TokenSettings};
pub use store::{
    InMemoryStore, PostRepository, PostgresStore, StoreError, UserRepository, VoteRepository,
};
