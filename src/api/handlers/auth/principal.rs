//! Authenticated principal extraction.
//!
//! Reads the access token (bearer header first, then cookie) and resolves it to
//! the stored user, so the role always reflects the current row.

use axum::http::HeaderMap;

use super::cookies::access_token;
use crate::auth::{AuthError, Principal, SessionManager};

pub async fn require_auth(
    headers: &HeaderMap,
    sessions: &SessionManager,
) -> Result<Principal, AuthError> {
    sessions
        .authenticate(access_token(headers).as_deref())
        .await
}
