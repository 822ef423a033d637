use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};

use postboard_core::UserId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CurrentUser;
use crate::middleware::{AuthState, auth_middleware};

/// Registration, listing and lookup are public; delete and update require a
/// bearer token.
///
/// The update route is `PUT /users{email}`: the email directly follows the
/// collection name with no separating slash.
pub fn router(auth: AuthState) -> Router {
    let protected = || from_fn_with_state(auth.clone(), auth_middleware);

    Router::new()
        .route("/users/", post(create_user).get(list_users))
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:email",
            get(get_user).merge(delete(delete_user).route_layer(protected())),
        )
        .route("/users/id/:id", delete(delete_user_by_id).route_layer(protected()))
        .route("/users:email", put(update_user).route_layer(protected()))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UserCreateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.register_user(&body.email, &body.password).await {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_out(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.list_users().await {
        Ok(users) => {
            let items = users.iter().map(dto::user_out).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> axum::response::Response {
    match services.user_by_email(&email).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_out(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(email): Path<String>,
) -> axum::response::Response {
    match services.delete_user_by_email(current.id(), &email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.delete_user_by_id(current.id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(email): Path<String>,
    body: Result<Json<dto::UserCreateRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services
        .update_user(current.id(), &email, &body.email, &body.password)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(dto::user_out(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
