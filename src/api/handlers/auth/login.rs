use anyhow::Context;
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{
    cookies::session_cookies,
    types::{LoginRequest, MessageResponse},
};
use crate::auth::{AuthError, SessionManager};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; sets access_token and refresh_token cookies", body = MessageResponse),
        (status = 401, description = "Invalid email or password", body = crate::api::handlers::error::ErrorBody),
        (status = 423, description = "Account locked; see Retry-After", body = crate::api::handlers::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    sessions: Extension<Arc<SessionManager>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(request) = payload.map_err(|_| AuthError::InvalidPayload)?;
    let pair = sessions
        .login(request.email.as_deref(), request.password.as_deref())
        .await?;
    let headers =
        session_cookies(sessions.config(), &pair).context("failed to build session cookies")?;
    Ok((
        StatusCode::OK,
        headers,
        Json(MessageResponse::new("Login successful")),
    ))
}
