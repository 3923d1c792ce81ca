use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::types::RegisterRequest;
use crate::auth::{AuthError, SessionManager, credentials::UserSummary};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserSummary),
        (status = 400, description = "Missing fields, invalid email or limit exceeded", body = crate::api::handlers::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::api::handlers::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    sessions: Extension<Arc<SessionManager>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(request) = payload.map_err(|_| AuthError::InvalidPayload)?;
    let user = sessions.register(request.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
