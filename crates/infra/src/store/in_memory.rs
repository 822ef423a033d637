use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use postboard_core::{PostId, UserId};
use postboard_posts::{Post, PostDraft, PostQuery, Vote, VotedPost};
use postboard_users::{NewUser, User, UserChanges};

use super::repository::{PostRepository, StoreError, UserRepository, VoteRepository};

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    votes: BTreeSet<Vote>,
    last_user_id: i64,
    last_post_id: i64,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email.as_str() == email && Some(u.id) != except)
    }

    fn vote_count(&self, post_id: PostId) -> i64 {
        let count = self.votes.iter().filter(|v| v.post_id == post_id).count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }

    /// Inner join on owner, outer join on votes.
    fn voted(&self, post: &Post) -> Option<VotedPost> {
        let owner = self.users.get(&post.owner_id)?;
        Some(VotedPost {
            post: post.clone(),
            owner: owner.clone(),
            votes: self.vote_count(post.id),
        })
    }
}

/// In-memory store for tests/dev. Implements every repository trait over one
/// shared state, with the same uniqueness and cascade rules as the Postgres
/// schema. Serial ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if state.email_taken(user.email.as_str(), None) {
            return Err(StoreError::UniqueViolation(format!("users.email = {}", user.email)));
        }

        state.last_user_id += 1;
        let created = User {
            id: UserId::from_i64(state.last_user_id),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email.as_str() == email)
            .cloned())
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.email_taken(changes.email.as_str(), Some(id)) {
            return Err(StoreError::UniqueViolation(format!("users.email = {}", changes.email)));
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        user.email = changes.email;
        user.password_hash = changes.password_hash;
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned: BTreeSet<PostId> = state
            .posts
            .values()
            .filter(|p| p.owner_id == id)
            .map(|p| p.id)
            .collect();
        state.posts.retain(|post_id, _| !owned.contains(post_id));
        state
            .votes
            .retain(|v| v.user_id != id && !owned.contains(&v.post_id));
        Ok(true)
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn list_with_votes(&self, query: &PostQuery) -> Result<Vec<VotedPost>, StoreError> {
        let state = self.read()?;
        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);

        Ok(state
            .posts
            .values()
            .filter(|p| query.matches_title(&p.title))
            .filter_map(|p| state.voted(p))
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn get_with_votes(&self, id: PostId) -> Result<Option<VotedPost>, StoreError> {
        let state = self.read()?;
        Ok(state.posts.get(&id).and_then(|p| state.voted(p)))
    }

    async fn find(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    async fn create(&self, owner_id: UserId, draft: PostDraft) -> Result<Post, StoreError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&owner_id) {
            return Err(StoreError::Backend(format!("posts.owner_id references missing user {owner_id}")));
        }

        state.last_post_id += 1;
        let post = Post {
            id: PostId::from_i64(state.last_post_id),
            title: draft.title,
            content: draft.content,
            published: draft.published,
            created_at: Utc::now(),
            owner_id,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: PostId, draft: PostDraft) -> Result<Option<Post>, StoreError> {
        let mut state = self.write()?;
        Ok(state.posts.get_mut(&id).map(|post| {
            post.apply(draft);
            post.clone()
        }))
    }

    async fn delete(&self, id: PostId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.posts.remove(&id).is_none() {
            return Ok(false);
        }
        state.votes.retain(|v| v.post_id != id);
        Ok(true)
    }
}

#[async_trait]
impl VoteRepository for InMemoryStore {
    async fn exists(&self, vote: Vote) -> Result<bool, StoreError> {
        Ok(self.read()?.votes.contains(&vote))
    }

    async fn insert(&self, vote: Vote) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.posts.contains_key(&vote.post_id) || !state.users.contains_key(&vote.user_id) {
            return Err(StoreError::Backend("votes reference a missing post or user".to_string()));
        }
        if !state.votes.insert(vote) {
            return Err(StoreError::UniqueViolation(format!(
                "votes ({}, {})",
                vote.post_id, vote.user_id
            )));
        }
        Ok(())
    }

    async fn delete(&self, vote: Vote) -> Result<bool, StoreError> {
        Ok(self.write()?.votes.remove(&vote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_users::Email;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_string(),
        }
    }

    async fn seed_user(store: &InMemoryStore, email: &str) -> User {
        UserRepository::create(store, new_user(email)).await.unwrap()
    }

    async fn seed_post(store: &InMemoryStore, owner: UserId, title: &str) -> Post {
        PostRepository::create(store, owner, PostDraft::new(title, "content", None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn user_ids_are_serial_and_emails_unique() {
        let store = InMemoryStore::new();
        let a = seed_user(&store, "a@x.com").await;
        let b = seed_user(&store, "b@x.com").await;
        assert_eq!(a.id, UserId::from_i64(1));
        assert_eq!(b.id, UserId::from_i64(2));

        let err = UserRepository::create(&store, new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));

        let all = UserRepository::list(&store).await.unwrap();
        assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn update_user_rejects_email_of_another_user() {
        let store = InMemoryStore::new();
        let a = seed_user(&store, "a@x.com").await;
        seed_user(&store, "b@x.com").await;

        let clash = UserChanges {
            email: Email::parse("b@x.com").unwrap(),
            password_hash: "h2".to_string(),
        };
        assert!(matches!(
            UserRepository::update(&store, a.id, clash).await,
            Err(StoreError::UniqueViolation(_))
        ));

        let own = UserChanges {
            email: Email::parse("a@x.com").unwrap(),
            password_hash: "h2".to_string(),
        };
        let updated = UserRepository::update(&store, a.id, own).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "h2");
        assert_eq!(updated.created_at, a.created_at);
    }

    #[tokio::test]
    async fn zero_vote_posts_are_listed_with_zero() {
        let store = InMemoryStore::new();
        let owner = seed_user(&store, "a@x.com").await;
        let voter = seed_user(&store, "b@x.com").await;
        let voted = seed_post(&store, owner.id, "first").await;
        let quiet = seed_post(&store, owner.id, "second").await;

        VoteRepository::insert(&store, Vote::new(voted.id, voter.id)).await.unwrap();
        VoteRepository::insert(&store, Vote::new(voted.id, owner.id)).await.unwrap();

        let listed = store.list_with_votes(&PostQuery::default()).await.unwrap();
        let counts: Vec<(PostId, i64)> = listed.iter().map(|v| (v.post.id, v.votes)).collect();
        assert_eq!(counts, vec![(voted.id, 2), (quiet.id, 0)]);
        assert_eq!(listed[1].owner.id, owner.id);
    }

    #[tokio::test]
    async fn duplicate_vote_is_a_unique_violation() {
        let store = InMemoryStore::new();
        let owner = seed_user(&store, "a@x.com").await;
        let post = seed_post(&store, owner.id, "t").await;
        let vote = Vote::new(post.id, owner.id);

        VoteRepository::insert(&store, vote).await.unwrap();
        assert!(matches!(
            VoteRepository::insert(&store, vote).await,
            Err(StoreError::UniqueViolation(_))
        ));
        assert!(VoteRepository::delete(&store, vote).await.unwrap());
        assert!(!VoteRepository::exists(&store, vote).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_posts_and_votes() {
        let store = InMemoryStore::new();
        let a = seed_user(&store, "a@x.com").await;
        let b = seed_user(&store, "b@x.com").await;
        let a_post = seed_post(&store, a.id, "a's").await;
        let b_post = seed_post(&store, b.id, "b's").await;
        VoteRepository::insert(&store, Vote::new(a_post.id, b.id)).await.unwrap();
        VoteRepository::insert(&store, Vote::new(b_post.id, a.id)).await.unwrap();

        assert!(UserRepository::delete(&store, a.id).await.unwrap());

        assert_eq!(PostRepository::find(&store, a_post.id).await.unwrap(), None);
        let b_view = store.get_with_votes(b_post.id).await.unwrap().unwrap();
        assert_eq!(b_view.votes, 0);
        assert!(!UserRepository::delete(&store, a.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_votes() {
        let store = InMemoryStore::new();
        let a = seed_user(&store, "a@x.com").await;
        let post = seed_post(&store, a.id, "t").await;
        let vote = Vote::new(post.id, a.id);
        VoteRepository::insert(&store, vote).await.unwrap();

        assert!(PostRepository::delete(&store, post.id).await.unwrap());
        assert!(!VoteRepository::exists(&store, vote).await.unwrap());
        assert!(!PostRepository::delete(&store, post.id).await.unwrap());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn block_on<F: core::future::Future>(fut: F) -> F::Output {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
                .block_on(fut)
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: listing equals "filter by title, order by id, then
            /// skip/limit" over the seeded posts, and every listed post carries
            /// exactly the votes cast on it.
            #[test]
            fn listing_matches_a_reference_model(
                titles in prop::collection::vec("[abT]{0,4}", 0..12),
                voted in prop::collection::vec(any::<bool>(), 12),
                search in "[abt]{0,2}",
                limit in 0i64..6,
                skip in 0i64..6,
            ) {
                let listed = block_on(async {
                    let store = InMemoryStore::new();
                    let owner = seed_user(&store, "owner@x.com").await;
                    for (i, title) in titles.iter().enumerate() {
                        let post = seed_post(&store, owner.id, title).await;
                        if voted[i] {
                            VoteRepository::insert(&store, Vote::new(post.id, owner.id)).await.unwrap();
                        }
                    }
                    let query = PostQuery::new(Some(search.clone()), Some(limit), Some(skip)).unwrap();
                    store.list_with_votes(&query).await.unwrap()
                });

                let expected: Vec<(i64, i64)> = titles
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.to_lowercase().contains(&search.to_lowercase()))
                    .map(|(i, _)| (i as i64 + 1, i64::from(voted[i])))
                    .skip(skip as usize)
                    .take(limit as usize)
                    .collect();
                let actual: Vec<(i64, i64)> =
                    listed.iter().map(|v| (v.post.id.as_i64(), v.votes)).collect();

                prop_assert_eq!(actual, expected);
            }
        }
    }
}
