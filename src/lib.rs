//! # Knowyourhero (peer feedback service)
//!
//! Users register, sign in, and leave reviews about their colleagues. Each review
//! has a positive and a negative free-text part, and what a reader sees depends on
//! their role.
//!
//! ## Sessions
//!
//! Signing in issues two HS256 JWTs, delivered as `HttpOnly` cookies:
//!
//! - **`access_token`:** short lived, sent with every API request.
//! - **`refresh_token`:** long lived, only accepted by `/api/auth/refresh`.
//!
//! Every refresh token is recorded in a ledger keyed by its `jti` (only a SHA-256
//! hash of the raw token is stored). Refresh tokens are single use: a refresh
//! revokes the presented token and issues a new pair in the same transaction, and
//! presenting a revoked token again is reported as a replay. A fresh login revokes
//! every refresh token the user still holds, so only one session chain is active.
//!
//! ## Lockout
//!
//! Consecutive failed logins are counted per account. Reaching the configured
//! threshold locks the account for a fixed duration, measured against the
//! database clock. While locked, the password is not even checked.
//!
//! ## Roles
//!
//! `super_reviewer`, `reviewer`, `colleague` and `guest`, in increasing order of
//! restriction. Only reviewers see negative feedback, and only super reviewers see
//! who wrote a review.

pub mod api;
pub mod auth;
pub mod cli;
pub mod reviews;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
