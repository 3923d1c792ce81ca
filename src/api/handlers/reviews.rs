//! Review endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via access token; the role comes from the stored user.
//! 2) Create or list reviews.
//! 3) Filter every returned review through the role's visible fields.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::principal::require_auth;
use crate::auth::{AuthError, SessionManager};
use crate::reviews::{self, ReviewInput, ReviewView};

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = ReviewInput,
    responses(
        (status = 201, description = "Review created.", body = ReviewView),
        (status = 400, description = "Missing recipient, empty review, limit exceeded or self review.", body = super::error::ErrorBody),
        (status = 401, description = "Missing, expired or invalid access token.", body = super::error::ErrorBody),
        (status = 403, description = "Role may not create this review.", body = super::error::ErrorBody),
        (status = 404, description = "Recipient not found.", body = super::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub async fn create_review(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, &sessions).await?;
    let Json(input) = payload.map_err(|_| AuthError::InvalidPayload)?;
    let review = reviews::create_review(sessions.store(), principal, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    responses(
        (status = 200, description = "All reviews, newest first, filtered by role.", body = [ReviewView]),
        (status = 401, description = "Missing, expired or invalid access token.", body = super::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub async fn list_reviews(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, &sessions).await?;
    let reviews = reviews::list_reviews(sessions.store(), principal).await?;
    Ok(Json(reviews))
}
