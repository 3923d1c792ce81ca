//! Credential store views and writes over user rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Role, error::AuthError, lockout::LoginState};
use crate::store::{InsertUserOutcome, NewUser, Transaction, UserRecord};

/// Public view of a user, returned by registration and `/api/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Entry of the `/api/users` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserListItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<UserRecord> for UserListItem {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl From<&UserRecord> for LoginState {
    fn from(user: &UserRecord) -> Self {
        Self {
            failed_attempts: user.failed_login_attempts,
            lock_until: user.lock_until,
        }
    }
}

/// # Errors
/// [`AuthError::EmailExists`] when the normalized email is taken.
pub async fn create_user(tx: &mut dyn Transaction, user: &NewUser) -> Result<UserRecord, AuthError> {
    match tx.insert_user(user).await? {
        InsertUserOutcome::Created(record) => Ok(record),
        InsertUserOutcome::Conflict => Err(AuthError::EmailExists),
    }
}

/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn save_login_state(
    tx: &mut dyn Transaction,
    user_id: Uuid,
    state: LoginState,
) -> Result<(), AuthError> {
    tx.update_login_state(user_id, state.failed_attempts, state.lock_until)
        .await?;
    Ok(())
}
