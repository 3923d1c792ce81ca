//! Refresh token ledger.
//!
//! One row per issued refresh token, keyed by its `jti`. Only the SHA-256 of the
//! raw token is stored. `revoked` only ever moves from false to true.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{error::AuthError, utils::hash_token};
use crate::store::{RefreshTokenRecord, Transaction};

/// Persist a freshly issued refresh token.
///
/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn record(
    tx: &mut dyn Transaction,
    jti: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    raw_token: &str,
) -> Result<(), AuthError> {
    tx.insert_refresh_token(&RefreshTokenRecord {
        id: jti,
        user_id,
        token_hash: hash_token(raw_token),
        expires_at,
        revoked: false,
    })
    .await?;
    Ok(())
}

/// Revoke one token. Of two concurrent revokes exactly one succeeds.
///
/// # Errors
/// [`AuthError::TokenNotFound`] when no row exists, [`AuthError::TokenAlreadyRevoked`]
/// when the row was already revoked.
pub async fn revoke(tx: &mut dyn Transaction, jti: Uuid) -> Result<(), AuthError> {
    if tx.revoke_refresh_token(jti).await? {
        return Ok(());
    }
    match tx.find_refresh_token(jti).await? {
        Some(_) => Err(AuthError::TokenAlreadyRevoked),
        None => Err(AuthError::TokenNotFound),
    }
}

/// Revoke every live token of a user and return how many were revoked.
///
/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn revoke_all_for_user(tx: &mut dyn Transaction, user_id: Uuid) -> Result<u64, AuthError> {
    Ok(tx.revoke_user_refresh_tokens(user_id).await?)
}

/// An unknown `jti` is reported as not revoked; pair with [`exists`].
///
/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn is_revoked(tx: &mut dyn Transaction, jti: Uuid) -> Result<bool, AuthError> {
    Ok(tx
        .find_refresh_token(jti)
        .await?
        .is_some_and(|token| token.revoked))
}

/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn exists(tx: &mut dyn Transaction, jti: Uuid) -> Result<bool, AuthError> {
    Ok(tx.find_refresh_token(jti).await?.is_some())
}

/// Whether the stored hash belongs to `raw_token`.
#[must_use]
pub fn token_matches(record: &RefreshTokenRecord, raw_token: &str) -> bool {
    record.token_hash == hash_token(raw_token)
}

/// Ledger lookup plus hash check in one call.
///
/// # Errors
/// Returns [`AuthError::Internal`] when the store fails.
pub async fn matches(tx: &mut dyn Transaction, jti: Uuid, raw_token: &str) -> Result<bool, AuthError> {
    Ok(tx
        .find_refresh_token(jti)
        .await?
        .is_some_and(|token| token_matches(&token, raw_token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::store::{InsertUserOutcome, MemoryStore, NewUser, Store};
    use anyhow::{Result, anyhow};
    use chrono::Duration;

    async fn user(tx: &mut dyn Transaction, email: &str) -> Result<Uuid> {
        match tx
            .insert_user(&NewUser {
                email: email.to_string(),
                name: "User".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Colleague,
            })
            .await?
        {
            InsertUserOutcome::Created(user) => Ok(user.id),
            InsertUserOutcome::Conflict => Err(anyhow!("conflict")),
        }
    }

    #[tokio::test]
    async fn record_then_revoke_once() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let user_id = user(tx.as_mut(), "a@x.com").await?;
        let jti = Uuid::new_v4();
        record(tx.as_mut(), jti, user_id, Utc::now() + Duration::hours(1), "raw").await?;

        assert!(exists(tx.as_mut(), jti).await?);
        assert!(!is_revoked(tx.as_mut(), jti).await?);
        assert!(matches(tx.as_mut(), jti, "raw").await?);
        assert!(!matches(tx.as_mut(), jti, "other").await?);

        revoke(tx.as_mut(), jti).await?;
        assert!(is_revoked(tx.as_mut(), jti).await?);
        assert!(matches!(
            revoke(tx.as_mut(), jti).await,
            Err(AuthError::TokenAlreadyRevoked)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_jti() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let jti = Uuid::new_v4();
        assert!(!exists(tx.as_mut(), jti).await?);
        assert!(!is_revoked(tx.as_mut(), jti).await?);
        assert!(matches!(
            revoke(tx.as_mut(), jti).await,
            Err(AuthError::TokenNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn revoke_all_only_touches_live_tokens_of_user() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let alice = user(tx.as_mut(), "alice@x.com").await?;
        let bob = user(tx.as_mut(), "bob@x.com").await?;
        let expires = Utc::now() + Duration::hours(1);

        let first = Uuid::new_v4();
        record(tx.as_mut(), first, alice, expires, "a1").await?;
        record(tx.as_mut(), Uuid::new_v4(), alice, expires, "a2").await?;
        record(tx.as_mut(), Uuid::new_v4(), alice, expires, "a3").await?;
        let bobs = Uuid::new_v4();
        record(tx.as_mut(), bobs, bob, expires, "b1").await?;
        revoke(tx.as_mut(), first).await?;

        assert_eq!(revoke_all_for_user(tx.as_mut(), alice).await?, 2);
        assert_eq!(revoke_all_for_user(tx.as_mut(), alice).await?, 0);
        assert!(!is_revoked(tx.as_mut(), bobs).await?);
        Ok(())
    }
}
