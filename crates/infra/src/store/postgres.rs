//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `UniqueViolation` | Duplicate email, duplicate vote |
//! | Database (other) | Any other | `Backend` | Foreign key / check failures |
//! | PoolClosed, Io, ... | N/A | `Backend` | Connection failures |
//!
//! Ownership cascades (user -> posts -> votes) are enforced by the schema's
//! `ON DELETE CASCADE` foreign keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use postboard_core::{PostId, UserId};
use postboard_posts::{Post, PostDraft, PostQuery, Vote, VotedPost};
use postboard_users::{Email, NewUser, User, UserChanges};

use super::repository::{PostRepository, StoreError, UserRepository, VoteRepository};
use crate::config::DatabaseSettings;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        published BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        owner_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        post_id BIGINT NOT NULL REFERENCES posts (id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        PRIMARY KEY (post_id, user_id)
    )
    "#,
];

const USER_COLUMNS: &str = "id, email, password, created_at";
const POST_COLUMNS: &str = "id, title, content, published, created_at, owner_id";

/// Posts joined with their owner and left-outer-joined with votes. Callers
/// append a WHERE clause, then the grouping below.
const VOTED_POST_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.content, p.published, p.created_at, p.owner_id,
        u.email AS owner_email,
        u.password AS owner_password,
        u.created_at AS owner_created_at,
        COUNT(v.post_id) AS votes
    FROM posts p
    JOIN users u ON u.id = p.owner_id
    LEFT OUTER JOIN votes v ON v.post_id = p.id
"#;

const VOTED_POST_GROUPING: &str = "GROUP BY p.id, u.id";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool using the configured connection settings.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(settings.connect_options())
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    #[instrument(skip(self, user), err)]
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, password) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        User::try_from(decode::<UserRow>(&row)?)
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(|row| User::try_from(decode::<UserRow>(row)?)).collect()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;

        row.map(|row| User::try_from(decode::<UserRow>(&row)?)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.map(|row| User::try_from(decode::<UserRow>(&row)?)).transpose()
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update(&self, id: UserId, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET email = $2, password = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(changes.email.as_str())
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        row.map(|row| User::try_from(decode::<UserRow>(&row)?)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostRepository for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_with_votes(&self, query: &PostQuery) -> Result<Vec<VotedPost>, StoreError> {
        let rows = sqlx::query(&format!(
            "{VOTED_POST_SELECT} WHERE p.title ILIKE '%' || $1 || '%' {VOTED_POST_GROUPING} \
             ORDER BY p.id LIMIT $2 OFFSET $3"
        ))
        .bind(escape_like(query.search()))
        .bind(query.limit())
        .bind(query.skip())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_posts", e))?;

        rows.iter().map(|row| VotedPost::try_from(decode::<VotedPostRow>(row)?)).collect()
    }

    #[instrument(skip(self), fields(post_id = %id), err)]
    async fn get_with_votes(&self, id: PostId) -> Result<Option<VotedPost>, StoreError> {
        let row = sqlx::query(&format!("{VOTED_POST_SELECT} WHERE p.id = $1 {VOTED_POST_GROUPING}"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_post", e))?;

        row.map(|row| VotedPost::try_from(decode::<VotedPostRow>(&row)?)).transpose()
    }

    #[instrument(skip(self), fields(post_id = %id), err)]
    async fn find(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_post", e))?;

        Ok(row.map(|row| decode::<PostRow>(&row)).transpose()?.map(Post::from))
    }

    #[instrument(skip(self, draft), fields(owner_id = %owner_id), err)]
    async fn create(&self, owner_id: UserId, draft: PostDraft) -> Result<Post, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (title, content, published, owner_id) VALUES ($1, $2, $3, $4) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.published)
        .bind(owner_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_post", e))?;

        Ok(decode::<PostRow>(&row)?.into())
    }

    #[instrument(skip(self, draft), fields(post_id = %id), err)]
    async fn update(&self, id: PostId, draft: PostDraft) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET title = $2, content = $3, published = $4 WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.published)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_post", e))?;

        Ok(row.map(|row| decode::<PostRow>(&row)).transpose()?.map(Post::from))
    }

    #[instrument(skip(self), fields(post_id = %id), err)]
    async fn delete(&self, id: PostId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_post", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VoteRepository for PostgresStore {
    #[instrument(skip(self), err)]
    async fn exists(&self, vote: Vote) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM votes WHERE post_id = $1 AND user_id = $2")
            .bind(vote.post_id.as_i64())
            .bind(vote.user_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("vote_exists", e))?;
        Ok(row.is_some())
    }

    #[instrument(skip(self), err)]
    async fn insert(&self, vote: Vote) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO votes (post_id, user_id) VALUES ($1, $2)")
            .bind(vote.post_id.as_i64())
            .bind(vote.user_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_vote", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, vote: Vote) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM votes WHERE post_id = $1 AND user_id = $2")
            .bind(vote.post_id.as_i64())
            .bind(vote.user_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_vote", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Escape `LIKE` metacharacters so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> Result<T, StoreError> {
    T::from_row(row).map_err(|e| StoreError::Backend(format!("failed to decode row: {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from_i64(row.id),
            email: parse_stored_email(&row.email)?,
            password_hash: row.password,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    published: bool,
    created_at: DateTime<Utc>,
    owner_id: i64,
}

impl<'r> FromRow<'r, PgRow> for PostRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PostRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            published: row.try_get("published")?,
            created_at: row.try_get("created_at")?,
            owner_id: row.try_get("owner_id")?,
        })
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId::from_i64(row.id),
            title: row.title,
            content: row.content,
            published: row.published,
            created_at: row.created_at,
            owner_id: UserId::from_i64(row.owner_id),
        }
    }
}

#[derive(Debug)]
struct VotedPostRow {
    post: PostRow,
    owner_email: String,
    owner_password: String,
    owner_created_at: DateTime<Utc>,
    votes: i64,
}

impl<'r> FromRow<'r, PgRow> for VotedPostRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VotedPostRow {
            post: PostRow::from_row(row)?,
            owner_email: row.try_get("owner_email")?,
            owner_password: row.try_get("owner_password")?,
            owner_created_at: row.try_get("owner_created_at")?,
            votes: row.try_get("votes")?,
        })
    }
}

impl TryFrom<VotedPostRow> for VotedPost {
    type Error = StoreError;

    fn try_from(row: VotedPostRow) -> Result<Self, Self::Error> {
        let owner = User {
            id: UserId::from_i64(row.post.owner_id),
            email: parse_stored_email(&row.owner_email)?,
            password_hash: row.owner_password,
            created_at: row.owner_created_at,
        };
        Ok(VotedPost {
            post: row.post.into(),
            owner,
            votes: row.votes,
        })
    }
}

fn parse_stored_email(raw: &str) -> Result<Email, StoreError> {
    Email::parse(raw).map_err(|e| StoreError::Backend(format!("stored email is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("rust"), "rust");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\tmp"), "c:\\\\tmp");
    }

    #[test]
    fn post_row_maps_to_post() {
        let now = Utc::now();
        let post: Post = PostRow {
            id: 4,
            title: "t".to_string(),
            content: "c".to_string(),
            published: false,
            created_at: now,
            owner_id: 2,
        }
        .into();

        assert_eq!(post.id, PostId::from_i64(4));
        assert_eq!(post.owner_id, UserId::from_i64(2));
        assert!(!post.published);
    }

    #[test]
    fn voted_row_with_bad_stored_email_is_a_backend_error() {
        let row = VotedPostRow {
            post: PostRow {
                id: 1,
                title: "t".to_string(),
                content: "c".to_string(),
                published: true,
                created_at: Utc::now(),
                owner_id: 1,
            },
            owner_email: "not-an-email".to_string(),
            owner_password: "h".to_string(),
            owner_created_at: Utc::now(),
            votes: 0,
        };

        assert!(matches!(VotedPost::try_from(row), Err(StoreError::Backend(_))));
    }
}
