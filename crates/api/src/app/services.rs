use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use postboard_auth::{AuthError, PasswordError, PasswordHasher, TokenService};
use postboard_core::{DomainError, PostId, UserId};
use postboard_infra::{
    InMemoryStore, PostRepository, PostgresStore, Settings, StoreError, UserRepository,
    VoteRepository,
};
use postboard_posts::{Post, PostDraft, PostQuery, Vote, VoteAction, VoteDirection, VotedPost};
use postboard_users::{Credentials, Email, NewUser, User, UserChanges};

use crate::middleware::AuthState;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A blocking task (password hashing) panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Everything the handlers need, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub tokens: Arc<TokenService>,
    pub hasher: PasswordHasher,
}

impl AppServices {
    /// Wire every repository to the same in-memory store.
    pub fn in_memory(tokens: TokenService, hasher: PasswordHasher) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            votes: store,
            tokens: Arc::new(tokens),
            hasher,
        }
    }

    pub fn postgres(store: PostgresStore, tokens: TokenService, hasher: PasswordHasher) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            posts: store.clone(),
            votes: store,
            tokens: Arc::new(tokens),
            hasher,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            tokens: self.tokens.clone(),
            users: self.users.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn register_user(&self, email: &str, password: &str) -> ServiceResult<User> {
        let credentials = Credentials::parse(email, password)?;

        if self.users.find_by_email(credentials.email.as_str()).await?.is_some() {
            return Err(duplicate_email(&credentials).into());
        }

        let password_hash = self.hash_password(credentials.password.clone()).await?;
        let user = self
            .users
            .create(NewUser {
                email: credentials.email.clone(),
                password_hash,
            })
            .await
            .map_err(|e| unique_to_domain(e, || duplicate_email(&credentials)))?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    pub async fn user_by_email(&self, email: &str) -> ServiceResult<User> {
        self.users
            .find_by_email(&lookup_key(email))
            .await?
            .ok_or_else(|| user_not_found_by_email(email).into())
    }

    pub async fn delete_user_by_email(&self, actor: UserId, email: &str) -> ServiceResult<()> {
        let user = self.user_by_email(email).await?;
        self.delete_user(actor, user).await
    }

    pub async fn delete_user_by_id(&self, actor: UserId, id: UserId) -> ServiceResult<()> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User with id: {id} is not found")))?;
        self.delete_user(actor, user).await
    }

    async fn delete_user(&self, actor: UserId, user: User) -> ServiceResult<()> {
        user.ensure_self(actor, "delete")?;
        if !self.users.delete(user.id).await? {
            return Err(user_not_found_by_email(user.email.as_str()).into());
        }
        tracing::info!(user_id = %user.id, "user deleted");
        Ok(())
    }

    /// Full replace of the target account's email and password.
    pub async fn update_user(
        &self,
        actor: UserId,
        target_email: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<User> {
        let target = self.user_by_email(target_email).await?;
        target.ensure_self(actor, "update")?;

        let credentials = Credentials::parse(email, password)?;
        if let Some(existing) = self.users.find_by_email(credentials.email.as_str()).await? {
            if existing.id != target.id {
                return Err(duplicate_email(&credentials).into());
            }
        }

        let password_hash = self.hash_password(credentials.password.clone()).await?;
        let changes = UserChanges {
            email: credentials.email.clone(),
            password_hash,
        };
        let updated = self
            .users
            .update(target.id, changes)
            .await
            .map_err(|e| unique_to_domain(e, || duplicate_email(&credentials)))?
            .ok_or_else(|| user_not_found_by_email(target_email))?;

        tracing::info!(user_id = %updated.id, "user updated");
        Ok(updated)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Login
    // ─────────────────────────────────────────────────────────────────────

    /// Exchange email + password for a bearer token. Unknown email and wrong
    /// password fail identically.
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<String> {
        let invalid = || DomainError::forbidden(AuthError::InvalidCredentials.to_string());

        let Some(user) = self.users.find_by_email(&lookup_key(username)).await? else {
            tracing::debug!("login for unknown email");
            return Err(invalid().into());
        };

        if !self.verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(invalid().into());
        }

        let token = self.tokens.issue(user.email.as_str(), Utc::now())?;
        tracing::info!(user_id = %user.id, "access token issued");
        Ok(token)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Posts
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_posts(&self, query: &PostQuery) -> ServiceResult<Vec<VotedPost>> {
        Ok(self.posts.list_with_votes(query).await?)
    }

    pub async fn get_post(&self, id: PostId) -> ServiceResult<VotedPost> {
        self.posts
            .get_with_votes(id)
            .await?
            .ok_or_else(|| Post::not_found(id).into())
    }

    pub async fn create_post(&self, owner: UserId, draft: PostDraft) -> ServiceResult<Post> {
        let post = self.posts.create(owner, draft).await?;
        tracing::info!(post_id = %post.id, owner_id = %owner, "post created");
        Ok(post)
    }

    pub async fn update_post(&self, actor: UserId, id: PostId, draft: PostDraft) -> ServiceResult<Post> {
        let existing = self.find_post(id).await?;
        existing.ensure_owned_by(actor, "update")?;

        let post = self
            .posts
            .update(id, draft)
            .await?
            .ok_or_else(|| Post::not_found(id))?;
        tracing::info!(post_id = %id, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, actor: UserId, id: PostId) -> ServiceResult<()> {
        let existing = self.find_post(id).await?;
        existing.ensure_owned_by(actor, "delete")?;

        if !self.posts.delete(id).await? {
            return Err(Post::not_found(id).into());
        }
        tracing::info!(post_id = %id, "post deleted");
        Ok(())
    }

    async fn find_post(&self, id: PostId) -> ServiceResult<Post> {
        self.posts
            .find(id)
            .await?
            .ok_or_else(|| Post::not_found(id).into())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Votes
    // ─────────────────────────────────────────────────────────────────────

    pub async fn vote(&self, actor: UserId, post_id: PostId, direction: VoteDirection) -> ServiceResult<VoteAction> {
        let vote = Vote::new(post_id, actor);

        if direction == VoteDirection::Cast && self.posts.find(post_id).await?.is_none() {
            return Err(Post::not_found(post_id).into());
        }

        let action = vote.plan(direction, self.votes.exists(vote).await?)?;
        match action {
            VoteAction::Insert => {
                self.votes
                    .insert(vote)
                    .await
                    .map_err(|e| unique_to_domain(e, || already_voted(&vote)))?;
                tracing::info!(post_id = %post_id, user_id = %actor, "vote cast");
            }
            VoteAction::Delete => {
                if !self.votes.delete(vote).await? {
                    return Err(DomainError::not_found("Vote does not exist").into());
                }
                tracing::info!(post_id = %post_id, user_id = %actor, "vote retracted");
            }
        }
        Ok(action)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Password hashing (CPU-bound, kept off the async workers)
    // ─────────────────────────────────────────────────────────────────────

    async fn hash_password(&self, password: String) -> ServiceResult<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, stored_hash: String) -> ServiceResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))
    }
}

/// Build services from settings: Postgres when a database is configured,
/// otherwise the in-memory store.
pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let tokens = TokenService::new(
        settings.token.secret.as_bytes(),
        settings.token.algorithm,
        settings.token.ttl,
    );
    let hasher = PasswordHasher::default();

    match &settings.database {
        Some(db) => {
            let store = PostgresStore::connect(db).await?;
            store.ensure_schema().await?;
            tracing::info!(host = %db.host, database = %db.name, "using postgres store");
            Ok(AppServices::postgres(store, tokens, hasher))
        }
        None => {
            tracing::warn!("DATABASE_HOST not set; using in-memory store");
            Ok(AppServices::in_memory(tokens, hasher))
        }
    }
}

fn duplicate_email(credentials: &Credentials) -> DomainError {
    DomainError::already_exists(format!("User with email: {} already exists", credentials.email))
}

fn already_voted(vote: &Vote) -> DomainError {
    DomainError::conflict(format!(
        "user {} has already voted on post {}",
        vote.user_id, vote.post_id
    ))
}

fn user_not_found_by_email(email: &str) -> DomainError {
    DomainError::not_found(format!("User with email: {} is not found", email.trim()))
}

/// Normalize a caller-supplied email the way it was normalized when stored.
/// Unparseable input is looked up as-is and simply matches nothing.
fn lookup_key(raw: &str) -> String {
    Email::parse(raw).map_or_else(|_| raw.trim().to_string(), String::from)
}

/// Unique violations lost to a concurrent writer surface as the same domain
/// error the pre-check would have produced.
fn unique_to_domain(err: StoreError, domain: impl FnOnce() -> DomainError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(_) => domain().into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use postboard_auth::SigningAlgorithm;

    fn services() -> AppServices {
        AppServices::in_memory(
            TokenService::new(b"s", SigningAlgorithm::Hs256, Duration::minutes(5)),
            PasswordHasher::with_params(1024, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let svc = services();
        let user = svc.register_user("a@x.com", "secret").await.unwrap();

        assert_ne!(user.password_hash, "secret");
        assert!(svc.hasher.verify("secret", &user.password_hash));
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_and_duplicates() {
        let svc = services();
        assert!(matches!(
            svc.register_user("nope", "pw").await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));
        assert!(matches!(
            svc.register_user("a@x.com", "").await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));

        svc.register_user("a@x.com", "pw").await.unwrap();
        assert!(matches!(
            svc.register_user(" a@x.com ", "pw").await,
            Err(ServiceError::Domain(DomainError::AlreadyExists(_)))
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = services();
        svc.register_user("a@x.com", "pw").await.unwrap();

        let unknown = svc.login("b@x.com", "pw").await.unwrap_err().to_string();
        let wrong = svc.login("a@x.com", "nope").await.unwrap_err().to_string();
        assert_eq!(unknown, wrong);
        assert_eq!(unknown, "Invalid Credentials");

        let token = svc.login("a@x.com", "pw").await.unwrap();
        assert_eq!(svc.tokens.verify(&token, Utc::now()).unwrap(), "a@x.com");
    }

    #[tokio::test]
    async fn email_lookups_ignore_domain_case() {
        let svc = services();
        let a = svc.register_user("a@x.com", "pw").await.unwrap();

        assert!(matches!(
            svc.register_user("a@X.COM", "pw").await,
            Err(ServiceError::Domain(DomainError::AlreadyExists(_)))
        ));
        assert_eq!(svc.user_by_email("a@X.Com").await.unwrap().id, a.id);
        assert!(svc.login("a@X.COM", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn missing_users_report_not_found() {
        let svc = services();
        let a = svc.register_user("a@x.com", "pw").await.unwrap();

        let err = svc.user_by_email("ghost@x.com").await.unwrap_err();
        assert_eq!(err.to_string(), "User with email: ghost@x.com is not found");

        let err = svc.delete_user_by_id(a.id, UserId::from_i64(42)).await.unwrap_err();
        assert_eq!(err.to_string(), "User with id: 42 is not found");
    }

    #[tokio::test]
    async fn update_user_keeps_id_and_rehashes() {
        let svc = services();
        let a = svc.register_user("a@x.com", "pw").await.unwrap();
        svc.register_user("b@x.com", "pw").await.unwrap();

        assert!(matches!(
            svc.update_user(a.id, "a@x.com", "b@x.com", "pw2").await,
            Err(ServiceError::Domain(DomainError::AlreadyExists(_)))
        ));

        let updated = svc.update_user(a.id, "a@x.com", "a2@x.com", "pw2").await.unwrap();
        assert_eq!(updated.id, a.id);
        assert_eq!(updated.email.as_str(), "a2@x.com");
        assert!(svc.hasher.verify("pw2", &updated.password_hash));
    }

    #[tokio::test]
    async fn vote_lifecycle() {
        let svc = services();
        let a = svc.register_user("a@x.com", "pw").await.unwrap();
        let post = svc.create_post(a.id, PostDraft::new("t", "c", None)).await.unwrap();

        assert_eq!(svc.vote(a.id, post.id, VoteDirection::Cast).await.unwrap(), VoteAction::Insert);
        assert!(matches!(
            svc.vote(a.id, post.id, VoteDirection::Cast).await,
            Err(ServiceError::Domain(DomainError::Conflict(_)))
        ));
        assert_eq!(svc.get_post(post.id).await.unwrap().votes, 1);

        assert_eq!(svc.vote(a.id, post.id, VoteDirection::Retract).await.unwrap(), VoteAction::Delete);
        assert!(matches!(
            svc.vote(a.id, post.id, VoteDirection::Retract).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
        assert!(matches!(
            svc.vote(a.id, PostId::from_i64(99), VoteDirection::Cast).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }
}
