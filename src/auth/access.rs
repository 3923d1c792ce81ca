//! Role-based review visibility.

use super::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewField {
    Id,
    CreatedAt,
    RecipientId,
    RecipientName,
    AuthorId,
    AuthorName,
    Positive,
    Negative,
}

const SUPER_REVIEWER_FIELDS: &[ReviewField] = &[
    ReviewField::Id,
    ReviewField::CreatedAt,
    ReviewField::RecipientId,
    ReviewField::RecipientName,
    ReviewField::AuthorId,
    ReviewField::AuthorName,
    ReviewField::Positive,
    ReviewField::Negative,
];

const REVIEWER_FIELDS: &[ReviewField] = &[
    ReviewField::Id,
    ReviewField::CreatedAt,
    ReviewField::RecipientId,
    ReviewField::RecipientName,
    ReviewField::Positive,
    ReviewField::Negative,
];

const BASIC_FIELDS: &[ReviewField] = &[
    ReviewField::Id,
    ReviewField::CreatedAt,
    ReviewField::RecipientId,
    ReviewField::RecipientName,
    ReviewField::Positive,
];

#[must_use]
pub const fn visible_fields(role: Role) -> &'static [ReviewField] {
    match role {
        Role::SuperReviewer => SUPER_REVIEWER_FIELDS,
        Role::Reviewer => REVIEWER_FIELDS,
        Role::Colleague | Role::Guest => BASIC_FIELDS,
    }
}

#[must_use]
pub fn can_see(role: Role, field: ReviewField) -> bool {
    visible_fields(role).contains(&field)
}

#[must_use]
pub const fn can_create_negative_review(role: Role) -> bool {
    matches!(role, Role::SuperReviewer | Role::Reviewer)
}

#[must_use]
pub const fn can_create_review(role: Role) -> bool {
    !matches!(role, Role::Guest)
}
