//! Refresh-token rotation and logout.

use anyhow::Context;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    cookies::{clear_session_cookies, refresh_token, session_cookies},
    types::MessageResponse,
};
use crate::auth::{AuthError, SessionManager};

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Token pair rotated; both cookies replaced", body = MessageResponse),
        (status = 401, description = "Missing, expired, invalid, unknown or revoked refresh token", body = crate::api::handlers::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> Result<impl IntoResponse, AuthError> {
    let token = refresh_token(&headers);
    let pair = sessions.refresh(token.as_deref()).await?;
    let cookies =
        session_cookies(sessions.config(), &pair).context("failed to build session cookies")?;
    Ok((
        StatusCode::OK,
        cookies,
        Json(MessageResponse::new("Token refresh successful")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> impl IntoResponse {
    let token = refresh_token(&headers);
    let outcome = sessions.logout(token.as_deref()).await;
    debug!(?outcome, "logout");

    // Always clear the cookies, even if the token was missing or invalid.
    (
        StatusCode::OK,
        clear_session_cookies(sessions.config()),
        Json(MessageResponse::new("Logout successful")),
    )
}
