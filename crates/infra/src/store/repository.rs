use async_trait::async_trait;
use thiserror::Error;

use postboard_core::{PostId, UserId};
use postboard_posts::{Post, PostDraft, PostQuery, Vote, VotedPost};
use postboard_users::{NewUser, User, UserChanges};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate email, duplicate vote).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// User persistence.
///
/// Lookups return `Ok(None)` for a missing row; deciding whether that is an
/// error belongs to the caller.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// All users ordered by id.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Full replace of email and password hash.
    async fn update(&self, id: UserId, changes: UserChanges) -> Result<Option<User>, StoreError>;

    /// Removes the user together with their posts and votes. Returns whether
    /// a row was removed.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;
}

/// Post persistence, including the vote-count aggregation.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts left-outer-joined with their votes and grouped by post, so a
    /// post nobody voted on reports `votes = 0`. Filtered by case-insensitive
    /// title substring, ordered by id, then paginated.
    async fn list_with_votes(&self, query: &PostQuery) -> Result<Vec<VotedPost>, StoreError>;

    /// Same aggregation for a single post.
    async fn get_with_votes(&self, id: PostId) -> Result<Option<VotedPost>, StoreError>;

    async fn find(&self, id: PostId) -> Result<Option<Post>, StoreError>;

    async fn create(&self, owner_id: UserId, draft: PostDraft) -> Result<Post, StoreError>;

    /// Full replace of title, content and published flag.
    async fn update(&self, id: PostId, draft: PostDraft) -> Result<Option<Post>, StoreError>;

    /// Removes the post and its votes. Returns whether a row was removed.
    async fn delete(&self, id: PostId) -> Result<bool, StoreError>;
}

/// Vote persistence: at most one vote per (post, user).
#[async_trait]
pub trait VoteRepository: Send + Sync {
    async fn exists(&self, vote: Vote) -> Result<bool, StoreError>;

    async fn insert(&self, vote: Vote) -> Result<(), StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, vote: Vote) -> Result<bool, StoreError>;
}
