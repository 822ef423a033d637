use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use postboard_core::PostId;
use postboard_posts::{VoteAction, VoteDirection};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CurrentUser;
use crate::middleware::{AuthState, auth_middleware};

pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/vote/", post(vote))
        .route("/vote", post(vote))
        .route_layer(from_fn_with_state(auth, auth_middleware))
}

pub async fn vote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<dto::VoteRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let post_id = PostId::from_i64(body.post_id);

    let message = match services.vote(current.id(), post_id, VoteDirection::from(body.dir)).await {
        Ok(VoteAction::Insert) => "successfully added vote",
        Ok(VoteAction::Delete) => "successfully deleted vote",
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(dto::MessageOut {
            message: message.to_string(),
        }),
    )
        .into_response()
}
