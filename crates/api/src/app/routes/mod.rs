use axum::{
    routing::{get, post},
    Router,
};

use crate::middleware::AuthState;

pub mod login;
pub mod posts;
pub mod system;
pub mod users;
pub mod votes;

/// Router for every endpoint. Protection is applied per route inside each
/// resource router.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/login", post(login::login))
        .merge(users::router(auth.clone()))
        .merge(posts::router(auth.clone()))
        .merge(votes::router(auth))
}
