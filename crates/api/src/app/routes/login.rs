use std::sync::Arc;

use axum::{
    extract::{Extension, Form, rejection::FormRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    form: Result<Form<dto::LoginForm>, FormRejection>,
) -> axum::response::Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.login(&form.username, &form.password).await {
        Ok(access_token) => (
            StatusCode::OK,
            Json(dto::TokenOut {
                access_token,
                token_type: "bearer".to_string(),
            }),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
