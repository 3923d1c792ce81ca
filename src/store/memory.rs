//! In-process store.
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state on commit.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    InsertUserOutcome, NewReview, NewUser, RefreshTokenRecord, ReviewRecord, Store, Transaction,
    UserRecord,
};

#[derive(Debug, Clone)]
struct StoredReview {
    id: Uuid,
    positive: Option<String>,
    negative: Option<String>,
    recipient_id: Uuid,
    author_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserRecord>,
    refresh_tokens: HashMap<Uuid, RefreshTokenRecord>,
    reviews: Vec<StoredReview>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock_offset_seconds: Arc<AtomicI64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the store clock forward; lock and expiry checks follow it.
    pub fn advance_clock(&self, seconds: i64) {
        self.clock_offset_seconds
            .fetch_add(seconds, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) async fn set_role(&self, user_id: Uuid, role: crate::auth::Role) {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.role = role;
        }
    }

    #[cfg(test)]
    pub(crate) async fn remove_user(&self, user_id: Uuid) {
        self.state.lock().await.users.remove(&user_id);
    }

    #[cfg(test)]
    pub(crate) async fn refresh_token(&self, jti: Uuid) -> Option<RefreshTokenRecord> {
        self.state.lock().await.refresh_tokens.get(&jti).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.state
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            clock_offset_seconds: Arc::clone(&self.clock_offset_seconds),
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    clock_offset_seconds: Arc<AtomicI64>,
}

impl MemoryTransaction {
    fn clock(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.clock_offset_seconds.load(Ordering::SeqCst))
    }

    fn user_name(&self, id: Uuid) -> String {
        self.working
            .users
            .get(&id)
            .map(|user| user.name.clone())
            .unwrap_or_default()
    }

    fn to_record(&self, review: &StoredReview) -> ReviewRecord {
        ReviewRecord {
            id: review.id,
            positive: review.positive.clone(),
            negative: review.negative.clone(),
            recipient_id: review.recipient_id,
            recipient_name: self.user_name(review.recipient_id),
            author_id: review.author_id,
            author_name: self.user_name(review.author_id),
            created_at: review.created_at,
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn now(&mut self) -> Result<DateTime<Utc>> {
        Ok(self.clock())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<InsertUserOutcome> {
        if self
            .working
            .users
            .values()
            .any(|existing| existing.email == user.email)
        {
            return Ok(InsertUserOutcome::Conflict);
        }
        let now = self.clock();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            failed_login_attempts: 0,
            lock_until: None,
            created_at: now,
            updated_at: now,
        };
        self.working.users.insert(record.id, record.clone());
        Ok(InsertUserOutcome::Created(record))
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .working
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn update_login_state(
        &mut self,
        id: Uuid,
        failed_login_attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = self.clock();
        let user = self
            .working
            .users
            .get_mut(&id)
            .ok_or_else(|| anyhow!("user {id} not found"))?;
        user.failed_login_attempts = failed_login_attempts;
        user.lock_until = lock_until;
        user.updated_at = now;
        Ok(())
    }

    async fn list_users_except(&mut self, id: Uuid) -> Result<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .working
            .users
            .values()
            .filter(|user| user.id != id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn insert_refresh_token(&mut self, token: &RefreshTokenRecord) -> Result<()> {
        if self.working.refresh_tokens.contains_key(&token.id) {
            return Err(anyhow!("refresh token {} already recorded", token.id));
        }
        self.working.refresh_tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_refresh_token(&mut self, jti: Uuid) -> Result<Option<RefreshTokenRecord>> {
        Ok(self.working.refresh_tokens.get(&jti).cloned())
    }

    async fn revoke_refresh_token(&mut self, jti: Uuid) -> Result<bool> {
        match self.working.refresh_tokens.get_mut(&jti) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_user_refresh_tokens(&mut self, user_id: Uuid) -> Result<u64> {
        let mut count = 0;
        for token in self.working.refresh_tokens.values_mut() {
            if token.user_id == user_id && !token.revoked {
                token.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<ReviewRecord> {
        for id in [review.recipient_id, review.author_id] {
            if !self.working.users.contains_key(&id) {
                return Err(anyhow!("user {id} not found"));
            }
        }
        let stored = StoredReview {
            id: Uuid::new_v4(),
            positive: review.positive.clone(),
            negative: review.negative.clone(),
            recipient_id: review.recipient_id,
            author_id: review.author_id,
            created_at: self.clock(),
        };
        let record = self.to_record(&stored);
        self.working.reviews.push(stored);
        Ok(record)
    }

    async fn list_reviews(&mut self) -> Result<Vec<ReviewRecord>> {
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut reviews: Vec<ReviewRecord> = self
            .working
            .reviews
            .iter()
            .rev()
            .map(|review| self.to_record(review))
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
