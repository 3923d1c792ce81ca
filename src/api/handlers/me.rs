use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::cookies::access_token;
use crate::auth::{AuthError, SessionManager, credentials::UserSummary};

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Return the authenticated user profile.", body = UserSummary),
        (status = 401, description = "Missing, expired or invalid access token.", body = super::error::ErrorBody),
        (status = 404, description = "User no longer exists.", body = super::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn get_me(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> Result<impl IntoResponse, AuthError> {
    let user = sessions
        .current_user(access_token(&headers).as_deref())
        .await?;
    Ok(Json(user))
}
