//! Login, refresh, logout and token-based identity.

use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    AuthConfig, Role,
    credentials::{self, UserListItem, UserSummary},
    error::AuthError,
    ledger,
    lockout::{LockoutPolicy, LoginState},
    password::PasswordHasher,
    token::{IssuedToken, TokenCodec, TokenError, TokenKind},
    utils::{MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, check_length, non_empty, normalize_email, valid_email},
};
use crate::store::{NewUser, Store, Transaction, UserRecord};

/// Raw registration input; absent and blank fields are reported together.
#[derive(Debug, Default, Clone)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Authenticated caller, resolved against the stored user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// What logout did with the presented refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    Revoked,
    AlreadyRevoked,
    NotFound,
    InvalidToken,
    MissingToken,
    StoreUnavailable,
}

pub struct SessionManager {
    store: Arc<dyn Store>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    lockout: LockoutPolicy,
    config: AuthConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("lockout", &self.lockout)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, codec: TokenCodec, config: AuthConfig) -> Self {
        let lockout = LockoutPolicy::new(config.lockout_attempts(), config.lockout_duration());
        Self {
            store,
            codec,
            hasher: PasswordHasher::default(),
            lockout,
            config,
        }
    }

    #[must_use]
    pub fn with_password_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Create a `colleague` account.
    ///
    /// # Errors
    /// Validation errors, [`AuthError::EmailExists`], or [`AuthError::Internal`].
    pub async fn register(&self, input: RegisterInput) -> Result<UserSummary, AuthError> {
        let email = non_empty(input.email.as_deref());
        let name = non_empty(input.name.as_deref());
        let password = input.password.as_deref().filter(|p| !p.trim().is_empty());

        let (Some(email), Some(name), Some(password)) = (email, name, password) else {
            let mut missing = Vec::new();
            if email.is_none() {
                missing.push("email");
            }
            if name.is_none() {
                missing.push("name");
            }
            if password.is_none() {
                missing.push("password");
            }
            return Err(AuthError::MissingFields(missing));
        };

        let email = normalize_email(email);
        check_length("email", &email, MAX_EMAIL_LENGTH)?;
        check_length("name", name, MAX_NAME_LENGTH)?;
        if !valid_email(&email) {
            return Err(AuthError::InvalidEmailFormat);
        }

        let password_hash = self.hash_password(password.to_string()).await?;

        let mut tx = self.store.begin().await?;
        let user = credentials::create_user(
            tx.as_mut(),
            &NewUser {
                email,
                name: name.to_string(),
                password_hash,
                role: Role::default(),
            },
        )
        .await?;
        tx.commit().await?;

        info!(user_id = %user.id, "user registered");
        Ok(UserSummary::from(&user))
    }

    /// Verify credentials and start a new session chain.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for unknown users and wrong passwords alike,
    /// [`AuthError::AccountLocked`] while the lock holds.
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let email = non_empty(email);
        let password = password.filter(|p| !p.trim().is_empty());
        let (Some(email), Some(password)) = (email, password) else {
            let mut missing = Vec::new();
            if email.is_none() {
                missing.push("email");
            }
            if password.is_none() {
                missing.push("password");
            }
            return Err(AuthError::MissingFields(missing));
        };

        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidEmailFormat);
        }

        let mut tx = self.store.begin().await?;
        let Some(user) = tx.find_user_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let now = tx.now().await?;
        if let (Some(retry_after), Some(until)) =
            (self.lockout.check_locked(user.lock_until, now), user.lock_until)
        {
            warn!(user_id = %user.id, %until, "login attempt on locked account");
            return Err(AuthError::AccountLocked { until, retry_after });
        }

        let verified = self
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?;
        let state = LoginState::from(&user);

        if !verified {
            let next = self.lockout.register_failure(state, now)?;
            credentials::save_login_state(tx.as_mut(), user.id, next).await?;
            tx.commit().await?;
            if next.is_locked_at(now) {
                warn!(
                    user_id = %user.id,
                    lock_until = ?next.lock_until,
                    "account locked after repeated failed logins"
                );
            } else {
                debug!(user_id = %user.id, attempts = next.failed_attempts, "failed login");
            }
            return Err(AuthError::InvalidCredentials);
        }

        let revoked = ledger::revoke_all_for_user(tx.as_mut(), user.id).await?;
        credentials::save_login_state(tx.as_mut(), user.id, self.lockout.register_success(state))
            .await?;
        let pair = self.issue_pair(tx.as_mut(), &user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, revoked, "login successful");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair. The presented token is spent.
    ///
    /// # Errors
    /// Token errors per the ledger state, or [`AuthError::UserNotFound`].
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        let token = non_empty(refresh_token).ok_or(AuthError::MissingToken)?;

        let claims = match self.codec.verify(token, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                self.revoke_expired(token).await;
                return Err(AuthError::TokenExpired);
            }
            Err(err) => return Err(err.into()),
        };

        let mut tx = self.store.begin().await?;
        let Some(record) = tx.find_refresh_token(claims.jti).await? else {
            return Err(AuthError::TokenNotFound);
        };

        if record.revoked {
            warn!(
                jti = %claims.jti,
                user_id = %claims.user_id,
                "revoked refresh token presented"
            );
            return Err(AuthError::TokenAlreadyRevoked);
        }

        if record.user_id != claims.user_id || !ledger::token_matches(&record, token) {
            warn!(jti = %claims.jti, "refresh token does not match ledger entry");
            return Err(AuthError::TokenMalformed);
        }

        let Some(user) = tx.find_user_by_id(claims.user_id).await? else {
            return Err(AuthError::UserNotFound);
        };

        ledger::revoke(tx.as_mut(), claims.jti).await?;
        let pair = self.issue_pair(tx.as_mut(), &user).await?;
        tx.commit().await?;

        debug!(
            user_id = %user.id,
            old_jti = %claims.jti,
            new_jti = %pair.refresh.jti,
            "refresh token rotated"
        );
        Ok(pair)
    }

    /// Best-effort revoke. The caller clears cookies regardless of the outcome.
    pub async fn logout(&self, refresh_token: Option<&str>) -> LogoutOutcome {
        let Some(token) = non_empty(refresh_token) else {
            return LogoutOutcome::MissingToken;
        };
        let Ok(claims) = self.codec.verify_ignoring_expiry(token, TokenKind::Refresh) else {
            return LogoutOutcome::InvalidToken;
        };

        let result: Result<(), AuthError> = async {
            let mut tx = self.store.begin().await?;
            if ledger::exists(tx.as_mut(), claims.jti).await?
                && !ledger::matches(tx.as_mut(), claims.jti, token).await?
            {
                return Err(AuthError::TokenMalformed);
            }
            let outcome = ledger::revoke(tx.as_mut(), claims.jti).await;
            tx.commit().await?;
            outcome
        }
        .await;

        match result {
            Ok(()) => {
                info!(user_id = %claims.user_id, "logout");
                LogoutOutcome::Revoked
            }
            Err(AuthError::TokenAlreadyRevoked) => LogoutOutcome::AlreadyRevoked,
            Err(AuthError::TokenNotFound) => LogoutOutcome::NotFound,
            Err(AuthError::TokenMalformed) => {
                warn!(jti = %claims.jti, "logout token does not match ledger entry");
                LogoutOutcome::InvalidToken
            }
            Err(err) => {
                error!("Failed to revoke refresh token on logout: {err:#}");
                LogoutOutcome::StoreUnavailable
            }
        }
    }

    /// Resolve an access token to its user.
    ///
    /// # Errors
    /// [`AuthError::MissingToken`], token errors, or [`AuthError::UserNotFound`].
    pub async fn authenticate(&self, access_token: Option<&str>) -> Result<Principal, AuthError> {
        let user = self.user_for_access_token(access_token).await?;
        Ok(Principal {
            user_id: user.id,
            role: user.role,
        })
    }

    /// # Errors
    /// Same as [`SessionManager::authenticate`].
    pub async fn current_user(&self, access_token: Option<&str>) -> Result<UserSummary, AuthError> {
        let user = self.user_for_access_token(access_token).await?;
        Ok(UserSummary::from(&user))
    }

    /// Every user except the caller.
    ///
    /// # Errors
    /// Same as [`SessionManager::authenticate`].
    pub async fn list_users(&self, access_token: Option<&str>) -> Result<Vec<UserListItem>, AuthError> {
        let caller = self.user_for_access_token(access_token).await?;
        let mut tx = self.store.begin().await?;
        let users = tx.list_users_except(caller.id).await?;
        Ok(users.into_iter().map(UserListItem::from).collect())
    }

    async fn user_for_access_token(&self, access_token: Option<&str>) -> Result<UserRecord, AuthError> {
        let token = non_empty(access_token).ok_or(AuthError::MissingToken)?;
        let claims = self.codec.verify(token, TokenKind::Access)?;
        let mut tx = self.store.begin().await?;
        tx.find_user_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn issue_pair(
        &self,
        tx: &mut dyn Transaction,
        user: &UserRecord,
    ) -> Result<TokenPair, AuthError> {
        let access = self.codec.issue(
            TokenKind::Access,
            user.id,
            user.role,
            self.config.access_token_ttl(),
        )?;
        let refresh = self.codec.issue(
            TokenKind::Refresh,
            user.id,
            user.role,
            self.config.refresh_token_ttl(),
        )?;
        ledger::record(tx, refresh.jti, user.id, refresh.expires_at, &refresh.token).await?;
        Ok(TokenPair { access, refresh })
    }

    async fn revoke_expired(&self, token: &str) {
        let Ok(claims) = self.codec.verify_ignoring_expiry(token, TokenKind::Refresh) else {
            return;
        };
        let result: anyhow::Result<()> = async {
            let mut tx = self.store.begin().await?;
            tx.revoke_refresh_token(claims.jti).await?;
            tx.commit().await
        }
        .await;
        if let Err(err) = result {
            error!("Failed to revoke expired refresh token: {err:#}");
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;
        Ok(digest)
    }

    async fn verify_password(&self, password: String, digest: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .context("password verification task failed")?;
        Ok(verified)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::password::fast_hasher;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use secrecy::SecretString;

    pub(crate) const SECRET: &str = "test-secret-test-secret-test-secret";

    pub(crate) fn manager_with(store: &MemoryStore, config: AuthConfig) -> SessionManager {
        SessionManager::new(
            Arc::new(store.clone()),
            TokenCodec::new(&SecretString::from(SECRET)),
            config,
        )
        .with_password_hasher(fast_hasher())
    }

    fn manager(store: &MemoryStore) -> SessionManager {
        manager_with(
            store,
            AuthConfig::new("http://localhost:5173".to_string()).with_lockout_attempts(3),
        )
    }

    fn input(email: &str) -> RegisterInput {
        RegisterInput {
            email: Some(email.to_string()),
            name: Some("Alice".to_string()),
            password: Some("p".to_string()),
        }
    }

    #[tokio::test]
    async fn register_normalizes_email_and_defaults_role() -> Result<()> {
        let store = MemoryStore::new();
        let user = manager(&store).register(input("  A@X.com ")).await?;
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.role, Role::Colleague);
        Ok(())
    }

    #[tokio::test]
    async fn register_duplicate_email() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let err = sessions.register(input("A@x.com")).await;
        assert!(matches!(err, Err(AuthError::EmailExists)));
        Ok(())
    }

    #[tokio::test]
    async fn register_reports_every_missing_field() {
        let store = MemoryStore::new();
        let err = manager(&store)
            .register(RegisterInput {
                email: Some("  ".to_string()),
                name: None,
                password: Some("p".to_string()),
            })
            .await;
        match err {
            Err(AuthError::MissingFields(fields)) => assert_eq!(fields, vec!["email", "name"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_validates_email_and_limits() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        assert!(matches!(
            sessions.register(input("not-an-email")).await,
            Err(AuthError::InvalidEmailFormat)
        ));
        let long = format!("{}@x.com", "a".repeat(120));
        assert!(matches!(
            sessions.register(input(&long)).await,
            Err(AuthError::MaxLimitExceeded { field: "email", .. })
        ));
    }

    #[tokio::test]
    async fn login_unknown_user_and_wrong_password_look_alike() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let unknown = sessions.login(Some("b@x.com"), Some("p")).await;
        let wrong = sessions.login(Some("a@x.com"), Some("q")).await;
        match (unknown, wrong) {
            (Err(first), Err(second)) => {
                assert!(matches!(first, AuthError::InvalidCredentials));
                assert_eq!(first.to_string(), second.to_string());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn login_locks_after_threshold_until_duration_elapses() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;

        for _ in 0..3 {
            assert!(matches!(
                sessions.login(Some("a@x.com"), Some("wrong")).await,
                Err(AuthError::InvalidCredentials)
            ));
        }

        // Correct password is not even checked while locked.
        match sessions.login(Some("a@x.com"), Some("p")).await {
            Err(AuthError::AccountLocked { retry_after, .. }) => {
                assert!(retry_after > 0 && retry_after <= 300);
            }
            other => panic!("expected lock, got {other:?}"),
        }

        let user = store.user_by_email("a@x.com").await;
        assert_eq!(user.map(|u| u.failed_login_attempts), Some(0));

        store.advance_clock(301);
        sessions.login(Some("a@x.com"), Some("p")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn successful_login_resets_counter() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        for _ in 0..2 {
            let _ = sessions.login(Some("a@x.com"), Some("wrong")).await;
        }
        sessions.login(Some("a@x.com"), Some("p")).await?;
        let user = store.user_by_email("a@x.com").await;
        assert_eq!(user.map(|u| u.failed_login_attempts), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn login_revokes_previous_refresh_tokens() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let first = sessions.login(Some("a@x.com"), Some("p")).await?;
        let second = sessions.login(Some("a@x.com"), Some("p")).await?;

        assert!(matches!(
            sessions.refresh(Some(&first.refresh.token)).await,
            Err(AuthError::TokenAlreadyRevoked)
        ));
        sessions.refresh(Some(&second.refresh.token)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn refresh_is_single_use() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        let rotated = sessions.refresh(Some(&pair.refresh.token)).await?;
        assert_ne!(rotated.refresh.jti, pair.refresh.jti);
        assert!(matches!(
            sessions.refresh(Some(&pair.refresh.token)).await,
            Err(AuthError::TokenAlreadyRevoked)
        ));
        sessions.refresh(Some(&rotated.refresh.token)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rejects_access_token_and_missing_token() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        assert!(matches!(
            sessions.refresh(Some(&pair.access.token)).await,
            Err(AuthError::TokenMalformed)
        ));
        assert!(matches!(
            sessions.refresh(None).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            sessions.refresh(Some("garbage")).await,
            Err(AuthError::TokenMalformed)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_with_unrecorded_token_is_not_found() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let codec = TokenCodec::new(&SecretString::from(SECRET));
        let stray = codec.issue(
            TokenKind::Refresh,
            Uuid::new_v4(),
            Role::Colleague,
            chrono::Duration::seconds(60),
        )?;
        assert!(matches!(
            sessions.refresh(Some(&stray.token)).await,
            Err(AuthError::TokenNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn expired_refresh_token_is_revoked() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager_with(
            &store,
            AuthConfig::new("http://localhost:5173".to_string()).with_refresh_token_ttl_seconds(-5),
        );
        sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        assert!(matches!(
            sessions.refresh(Some(&pair.refresh.token)).await,
            Err(AuthError::TokenExpired)
        ));
        let row = store.refresh_token(pair.refresh.jti).await;
        assert!(row.is_some_and(|row| row.revoked));
        Ok(())
    }

    #[tokio::test]
    async fn logout_then_refresh() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        assert_eq!(
            sessions.logout(Some(&pair.refresh.token)).await,
            LogoutOutcome::Revoked
        );
        assert_eq!(
            sessions.logout(Some(&pair.refresh.token)).await,
            LogoutOutcome::AlreadyRevoked
        );
        assert!(matches!(
            sessions.refresh(Some(&pair.refresh.token)).await,
            Err(AuthError::TokenAlreadyRevoked)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn logout_never_fails() {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        assert_eq!(sessions.logout(None).await, LogoutOutcome::MissingToken);
        assert_eq!(
            sessions.logout(Some("garbage")).await,
            LogoutOutcome::InvalidToken
        );
    }

    #[tokio::test]
    async fn authenticate_uses_stored_role() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;
        store.set_role(user.id, Role::Reviewer).await;

        let principal = sessions.authenticate(Some(&pair.access.token)).await?;
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.role, Role::Reviewer);

        assert!(matches!(
            sessions.authenticate(Some(&pair.refresh.token)).await,
            Err(AuthError::TokenMalformed)
        ));
        assert!(matches!(
            sessions.authenticate(None).await,
            Err(AuthError::MissingToken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn list_users_excludes_caller() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        sessions.register(input("a@x.com")).await?;
        let bob = sessions.register(input("b@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        let users = sessions.list_users(Some(&pair.access.token)).await?;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, bob.id);

        let me = sessions.current_user(Some(&pair.access.token)).await?;
        assert_eq!(me.email, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn list_users_requires_existing_caller() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let alice = sessions.register(input("a@x.com")).await?;
        sessions.register(input("b@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        store.remove_user(alice.id).await;
        assert!(matches!(
            sessions.list_users(Some(&pair.access.token)).await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            sessions.current_user(Some(&pair.access.token)).await,
            Err(AuthError::UserNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_for_removed_user() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let alice = sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        store.remove_user(alice.id).await;
        assert!(matches!(
            sessions.refresh(Some(&pair.refresh.token)).await,
            Err(AuthError::UserNotFound)
        ));
        // Nothing was committed, so the token is still live.
        let row = store.refresh_token(pair.refresh.jti).await;
        assert!(row.is_some_and(|row| !row.revoked));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_refreshes_of_one_token() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = Arc::new(manager(&store));
        sessions.register(input("a@x.com")).await?;
        let pair = sessions.login(Some("a@x.com"), Some("p")).await?;

        let spawn_refresh = |token: String| {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move { sessions.refresh(Some(&token)).await })
        };
        let first = spawn_refresh(pair.refresh.token.clone());
        let second = spawn_refresh(pair.refresh.token.clone());
        let results = [first.await?, second.await?];

        let succeeded = results.iter().filter(|result| result.is_ok()).count();
        let replayed = results
            .iter()
            .filter(|result| matches!(result, Err(AuthError::TokenAlreadyRevoked)))
            .count();
        assert_eq!((succeeded, replayed), (1, 1));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failed_logins_all_count() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = Arc::new(manager(&store));
        sessions.register(input("a@x.com")).await?;

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let sessions = Arc::clone(&sessions);
                tokio::spawn(async move { sessions.login(Some("a@x.com"), Some("wrong")).await })
            })
            .collect();
        for task in tasks {
            assert!(matches!(task.await?, Err(AuthError::InvalidCredentials)));
        }

        let user = store.user_by_email("a@x.com").await;
        assert!(user.is_some_and(|u| u.failed_login_attempts == 0 && u.lock_until.is_some()));
        assert!(matches!(
            sessions.login(Some("a@x.com"), Some("p")).await,
            Err(AuthError::AccountLocked { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn overlong_lock_duration_fails_without_panicking() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager_with(
            &store,
            AuthConfig::new("http://localhost:5173".to_string())
                .with_lockout_attempts(1)
                .with_lockout_duration_seconds(9_000_000_000_000),
        );
        sessions.register(input("a@x.com")).await?;
        assert!(matches!(
            sessions.login(Some("a@x.com"), Some("wrong")).await,
            Err(AuthError::Internal(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn overlong_refresh_ttl_fails_without_panicking() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager_with(
            &store,
            AuthConfig::new("http://localhost:5173".to_string())
                .with_refresh_token_ttl_seconds(9_000_000_000_000),
        );
        sessions.register(input("a@x.com")).await?;
        assert!(matches!(
            sessions.login(Some("a@x.com"), Some("p")).await,
            Err(AuthError::Internal(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn logout_ignores_token_not_matching_ledger() -> Result<()> {
        let store = MemoryStore::new();
        let sessions = manager(&store);
        let user = sessions.register(input("a@x.com")).await?;
        let codec = TokenCodec::new(&SecretString::from(SECRET));
        let issued = codec.issue(
            TokenKind::Refresh,
            user.id,
            Role::Colleague,
            chrono::Duration::seconds(60),
        )?;

        let mut tx = store.begin().await?;
        ledger::record(tx.as_mut(), issued.jti, user.id, issued.expires_at, "other").await?;
        tx.commit().await?;

        assert_eq!(
            sessions.logout(Some(&issued.token)).await,
            LogoutOutcome::InvalidToken
        );
        let row = store.refresh_token(issued.jti).await;
        assert!(row.is_some_and(|row| !row.revoked));
        Ok(())
    }
}
