//! Reviews: creation rules and role-filtered listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{
    AuthError, Principal, Role,
    access::{ReviewField, can_create_negative_review, can_create_review, can_see},
    utils::{check_length, non_empty},
};
use crate::store::{NewReview, ReviewRecord, Store};

pub const MAX_REVIEW_LENGTH: usize = 1000;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ReviewInput {
    pub recipient_id: Option<Uuid>,
    pub positive: Option<String>,
    pub negative: Option<String>,
}

/// A review as seen by one role. Hidden fields are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReviewView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub positive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<String>,
}

impl ReviewView {
    #[must_use]
    pub fn for_role(record: ReviewRecord, role: Role) -> Self {
        let show_author = can_see(role, ReviewField::AuthorId);
        Self {
            id: record.id,
            created_at: record.created_at,
            recipient_id: record.recipient_id,
            recipient_name: record.recipient_name,
            author_id: show_author.then_some(record.author_id),
            author_name: can_see(role, ReviewField::AuthorName).then_some(record.author_name),
            positive: record.positive,
            negative: if can_see(role, ReviewField::Negative) {
                record.negative
            } else {
                None
            },
        }
    }
}

/// # Errors
/// Validation errors, [`AuthError::SelfReviewNotAllowed`], [`AuthError::PermissionDenied`],
/// [`AuthError::ReviewTargetNotFound`] or [`AuthError::Internal`].
pub async fn create_review(
    store: &dyn Store,
    principal: Principal,
    input: ReviewInput,
) -> Result<ReviewView, AuthError> {
    let recipient_id = input
        .recipient_id
        .ok_or_else(|| AuthError::MissingFields(vec!["recipient_id"]))?;

    let positive = non_empty(input.positive.as_deref()).map(str::to_string);
    let negative = non_empty(input.negative.as_deref()).map(str::to_string);
    if positive.is_none() && negative.is_none() {
        return Err(AuthError::EmptyReview);
    }
    if let Some(positive) = &positive {
        check_length("positive", positive, MAX_REVIEW_LENGTH)?;
    }
    if let Some(negative) = &negative {
        check_length("negative", negative, MAX_REVIEW_LENGTH)?;
    }

    if recipient_id == principal.user_id {
        return Err(AuthError::SelfReviewNotAllowed);
    }
    if !can_create_review(principal.role)
        || (negative.is_some() && !can_create_negative_review(principal.role))
    {
        return Err(AuthError::PermissionDenied);
    }

    let mut tx = store.begin().await?;
    if tx.find_user_by_id(recipient_id).await?.is_none() {
        return Err(AuthError::ReviewTargetNotFound);
    }
    let record = tx
        .insert_review(&NewReview {
            positive,
            negative,
            recipient_id,
            author_id: principal.user_id,
        })
        .await?;
    tx.commit().await?;

    tracing::info!(review_id = %record.id, author_id = %principal.user_id, "review created");
    Ok(ReviewView::for_role(record, principal.role))
}

/// Every review, newest first, filtered for the caller's role.
///
/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn list_reviews(store: &dyn Store, principal: Principal) -> Result<Vec<ReviewView>, AuthError> {
    let mut tx = store.begin().await?;
    let reviews = tx.list_reviews().await?;
    Ok(reviews
        .into_iter()
        .map(|record| ReviewView::for_role(record, principal.role))
        .collect())
}
