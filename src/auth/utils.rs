//! Small helpers for input validation and token hashing.

use regex::Regex;
use sha2::{Digest, Sha256};

use super::error::AuthError;

pub const MAX_EMAIL_LENGTH: usize = 120;
pub const MAX_NAME_LENGTH: usize = 256;

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Hash a refresh token so raw values never touch the database.
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Trim an optional input, treating blank strings as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Reject values longer than `limit` characters.
pub fn check_length(field: &'static str, value: &str, limit: usize) -> Result<(), AuthError> {
    if value.chars().count() > limit {
        return Err(AuthError::MaxLimitExceeded { field, limit });
    }
    Ok(())
}
