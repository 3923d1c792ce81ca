use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::cookies::access_token;
use crate::auth::{AuthError, SessionManager, credentials::UserListItem};

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Every user except the caller.", body = [UserListItem]),
        (status = 401, description = "Missing, expired or invalid access token.", body = super::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> Result<impl IntoResponse, AuthError> {
    let users = sessions
        .list_users(access_token(&headers).as_deref())
        .await?;
    Ok(Json(users))
}
