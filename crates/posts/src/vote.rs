//! Votes: one per (post, user), cast or retracted by direction.

use serde::{Deserialize, Serialize};

use postboard_core::{DomainError, DomainResult, PostId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vote {
    pub post_id: PostId,
    pub user_id: UserId,
}

/// Direction of a vote request (`dir` on the wire).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoteDirection {
    Cast,
    Retract,
}

impl From<bool> for VoteDirection {
    fn from(dir: bool) -> Self {
        if dir { Self::Cast } else { Self::Retract }
    }
}

/// Store operation decided by [`Vote::plan`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoteAction {
    Insert,
    Delete,
}

impl Vote {
    pub fn new(post_id: PostId, user_id: UserId) -> Self {
        Self { post_id, user_id }
    }

    /// Decide what a vote request does given whether this vote already exists.
    ///
    /// Casting twice is a conflict; retracting a vote that was never cast is
    /// not found.
    pub fn plan(&self, direction: VoteDirection, already_cast: bool) -> DomainResult<VoteAction> {
        match (direction, already_cast) {
            (VoteDirection::Cast, false) => Ok(VoteAction::Insert),
            (VoteDirection::Cast, true) => Err(DomainError::conflict(format!(
                "user {} has already voted on post {}",
                self.user_id, self.post_id
            ))),
            (VoteDirection::Retract, true) => Ok(VoteAction::Delete),
            (VoteDirection::Retract, false) => Err(DomainError::not_found("Vote does not exist")),
        }
    }
}
