//! Persistence seam.
//!
//! Components never talk to a database directly; they receive a
//! [`Transaction`] and call its primitive queries. Everything done through one
//! transaction becomes visible atomically on [`Transaction::commit`] and is
//! discarded when the transaction is dropped without committing.
//!
//! Two implementations exist:
//!
//! - [`postgres::PgStore`]: `sqlx` on Postgres, row locks (`FOR UPDATE`) for the
//!   user row during login and the ledger row during refresh/logout.
//! - [`memory::MemoryStore`]: a single async mutex serializes transactions. Used by
//!   tests and for running without a database.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Role;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub failed_login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(UserRecord),
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub positive: Option<String>,
    pub negative: Option<String>,
    pub recipient_id: Uuid,
    pub author_id: Uuid,
}

/// A review joined with the display names of both parties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub positive: Option<String>,
    pub negative: Option<String>,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait Transaction: Send {
    /// The store's authoritative clock.
    async fn now(&mut self) -> Result<DateTime<Utc>>;

    async fn insert_user(&mut self, user: &NewUser) -> Result<InsertUserOutcome>;

    /// Looks up by normalized email and locks the row until commit.
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<UserRecord>>;

    async fn update_login_state(
        &mut self,
        id: Uuid,
        failed_login_attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// All users except `id`, ordered by name.
    async fn list_users_except(&mut self, id: Uuid) -> Result<Vec<UserRecord>>;

    async fn insert_refresh_token(&mut self, token: &RefreshTokenRecord) -> Result<()>;

    /// Looks up by `jti` and locks the row until commit.
    async fn find_refresh_token(&mut self, jti: Uuid) -> Result<Option<RefreshTokenRecord>>;

    /// Flips `revoked` only if it is still false. Returns whether a row changed.
    async fn revoke_refresh_token(&mut self, jti: Uuid) -> Result<bool>;

    /// Revokes every live token of the user. Returns how many rows changed.
    async fn revoke_user_refresh_tokens(&mut self, user_id: Uuid) -> Result<u64>;

    async fn insert_review(&mut self, review: &NewReview) -> Result<ReviewRecord>;

    /// All reviews, newest first.
    async fn list_reviews(&mut self) -> Result<Vec<ReviewRecord>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
