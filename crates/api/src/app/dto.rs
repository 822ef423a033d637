use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use postboard_core::{PostId, UserId};
use postboard_posts::{Post, VotedPost};
use postboard_users::User;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UserCreateRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PostCreateRequest {
    pub title: String,
    pub content: String,
    pub published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub post_id: i64,
    pub dir: bool,
}

/// OAuth2 password-flow form; `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct UserOut {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostOut {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub id: PostId,
    pub created_at: DateTime<Utc>,
    pub owner_id: UserId,
    pub owner: UserOut,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostVotedOut {
    #[serde(rename = "Post")]
    pub post: PostOut,
    pub votes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageOut {
    pub message: String,
}

pub fn user_out(user: &User) -> UserOut {
    UserOut {
        id: user.id,
        email: user.email.as_str().to_string(),
        created_at: user.created_at,
    }
}

pub fn post_out(post: Post, owner: &User) -> PostOut {
    PostOut {
        title: post.title,
        content: post.content,
        published: post.published,
        id: post.id,
        created_at: post.created_at,
        owner_id: post.owner_id,
        owner: user_out(owner),
    }
}

pub fn voted_post_out(voted: VotedPost) -> PostVotedOut {
    PostVotedOut {
        post: post_out(voted.post, &voted.owner),
        votes: voted.votes,
    }
}
