use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use postboard_core::{DomainError, DomainResult, PostId, UserId};
use postboard_users::User;

/// A post as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub owner_id: UserId,
}

impl Post {
    /// Only the owner may update or delete a post.
    pub fn ensure_owned_by(&self, actor: UserId, action: &str) -> DomainResult<()> {
        if self.owner_id != actor {
            return Err(DomainError::forbidden(format!("Not authorized to {action} this post")));
        }
        Ok(())
    }

    /// Full replace of the mutable fields (no partial-update semantics).
    pub fn apply(&mut self, draft: PostDraft) {
        self.title = draft.title;
        self.content = draft.content;
        self.published = draft.published;
    }

    pub fn not_found(id: PostId) -> DomainError {
        DomainError::not_found(format!("Post with id: {id} is not found"))
    }
}

/// Caller-supplied post fields, used for both create and full update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub published: bool,
}

impl PostDraft {
    /// `published` defaults to `true` when not supplied.
    pub fn new(title: impl Into<String>, content: impl Into<String>, published: Option<bool>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            published: published.unwrap_or(true),
        }
    }
}

/// Read model returned by the vote-count aggregation: a post, its owner and
/// the number of votes cast on it (zero when nobody voted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotedPost {
    pub post: Post,
    pub owner: User,
    pub votes: i64,
}
