use chrono::{DateTime, Utc};
use thiserror::Error;

use super::token::TokenError;

/// Every failure a request can end with.
///
/// Handlers translate these into HTTP responses at the boundary; the `Display`
/// text is what the client sees, except for [`AuthError::Internal`] whose detail
/// stays in the server log.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Required fields are missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid request payload")]
    InvalidPayload,
    #[error("Invalid email format")]
    InvalidEmailFormat,
    #[error("Character limit exceeded for {field}: maximum is {limit}")]
    MaxLimitExceeded { field: &'static str, limit: usize },
    #[error("At least one of positive or negative should be filled")]
    EmptyReview,
    #[error("User with this email already exists")]
    EmailExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Your account is locked until {until}")]
    AccountLocked {
        until: DateTime<Utc>,
        retry_after: i64,
    },
    #[error("Authentication token is required")]
    MissingToken,
    #[error("Authentication token has expired")]
    TokenExpired,
    #[error("Authentication token is invalid")]
    TokenMalformed,
    #[error("Refresh token is not found")]
    TokenNotFound,
    #[error("Refresh token has already been revoked")]
    TokenAlreadyRevoked,
    #[error("User not found")]
    UserNotFound,
    #[error("You do not have permission to perform this action")]
    PermissionDenied,
    #[error("You cannot submit a review for yourself")]
    SelfReviewNotAllowed,
    #[error("User to review not found")]
    ReviewTargetNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable code returned alongside the message.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::InvalidEmailFormat => "INVALID_EMAIL_FORMAT",
            Self::MaxLimitExceeded { .. } => "MAX_LIMIT_EXCEEDED",
            Self::EmptyReview => "NON_EMPTY_ERROR",
            Self::EmailExists => "EMAIL_EXISTS",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::MissingToken => "MISSING_TOKEN",
            Self::TokenExpired => "EXPIRED_TOKEN",
            Self::TokenMalformed => "INVALID_TOKEN",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenAlreadyRevoked => "TOKEN_ALREADY_REVOKED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::PermissionDenied => "INSUFFICIENT_PERMISSIONS",
            Self::SelfReviewNotAllowed => "SELF_REVIEW_NOT_ALLOWED",
            Self::ReviewTargetNotFound => "REVIEW_TARGET_NOT_FOUND",
            Self::Internal(_) => "SERVER_ERROR",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Malformed => Self::TokenMalformed,
            TokenError::TtlOutOfRange => {
                Self::Internal(anyhow::anyhow!("token lifetime out of range"))
            }
            TokenError::Encode(err) => Self::Internal(anyhow::Error::new(err).context("token signing failed")),
        }
    }
}
