use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use postboard_core::PostId;
use postboard_posts::{PostDraft, PostQuery};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CurrentUser;
use crate::middleware::{AuthState, auth_middleware};

pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post).put(update_post).delete(delete_post))
        .route_layer(from_fn_with_state(auth, auth_middleware))
}

pub async fn list_posts(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListPostsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let query = match PostQuery::new(params.search, params.limit, params.skip) {
        Ok(query) => query,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.list_posts(&query).await {
        Ok(posts) => {
            let items = posts.into_iter().map(dto::voted_post_out).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_post(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_post_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_post(id).await {
        Ok(voted) => (StatusCode::OK, Json(dto::voted_post_out(voted))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<dto::PostCreateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let draft = PostDraft::new(body.title, body.content, body.published);

    match services.create_post(current.id(), draft).await {
        Ok(post) => (StatusCode::CREATED, Json(dto::post_out(post, current.user()))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<dto::PostCreateRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_post_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let draft = PostDraft::new(body.title, body.content, body.published);

    // Only the owner gets past the ownership check, so the caller is the owner.
    match services.update_post(current.id(), id, draft).await {
        Ok(post) => (StatusCode::OK, Json(dto::post_out(post, current.user()))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_post_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.delete_post(current.id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_post_id(raw: &str) -> Result<PostId, axum::response::Response> {
    raw.parse::<PostId>().map_err(errors::domain_error_to_response)
}
