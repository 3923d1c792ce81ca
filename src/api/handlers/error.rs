//! HTTP mapping for [`AuthError`].

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::AuthError;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[must_use]
pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingFields(_)
        | AuthError::InvalidPayload
        | AuthError::InvalidEmailFormat
        | AuthError::MaxLimitExceeded { .. }
        | AuthError::EmptyReview
        | AuthError::SelfReviewNotAllowed => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials
        | AuthError::MissingToken
        | AuthError::TokenExpired
        | AuthError::TokenMalformed
        | AuthError::TokenNotFound
        | AuthError::TokenAlreadyRevoked => StatusCode::UNAUTHORIZED,
        AuthError::PermissionDenied => StatusCode::FORBIDDEN,
        AuthError::UserNotFound | AuthError::ReviewTargetNotFound => StatusCode::NOT_FOUND,
        AuthError::EmailExists => StatusCode::CONFLICT,
        AuthError::AccountLocked { .. } => StatusCode::LOCKED,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let mut headers = HeaderMap::new();

        let detail = match &self {
            AuthError::Internal(err) => {
                error!("Request failed: {err:#}");
                ErrorDetail {
                    code: self.code().to_string(),
                    message: INTERNAL_MESSAGE.to_string(),
                    time: None,
                }
            }
            AuthError::AccountLocked { until, retry_after } => {
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    headers.insert(RETRY_AFTER, value);
                }
                ErrorDetail {
                    code: self.code().to_string(),
                    message: self.to_string(),
                    time: Some(until.to_rfc3339()),
                }
            }
            _ => ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                time: None,
            },
        };

        (status, headers, Json(ErrorBody { error: detail })).into_response()
    }
}
