//! Consecutive failed-login tracking.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_THRESHOLD: u32 = 10;
pub const DEFAULT_DURATION_SECONDS: i64 = 300;

/// Persisted counter and lock timestamp of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginState {
    pub failed_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
}

impl LoginState {
    /// True while the lock is still in force at `now`.
    #[must_use]
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    threshold: u32,
    duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, Duration::seconds(DEFAULT_DURATION_SECONDS))
    }
}

impl LockoutPolicy {
    /// A threshold of zero is treated as one.
    #[must_use]
    pub fn new(threshold: u32, duration: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            duration,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Seconds until the lock lifts, or `None` when the account is usable.
    #[must_use]
    pub fn check_locked(&self, lock_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
        let until = lock_until?;
        if until <= now {
            return None;
        }
        let remaining = (until - now).num_milliseconds();
        // Round up so a client never retries a fraction of a second early.
        Some(((remaining + 999) / 1000).max(1))
    }

    /// Count one wrong password. Reaching the threshold locks the account and
    /// starts the counter over.
    ///
    /// # Errors
    /// Returns an error if `now + duration` is not a representable timestamp.
    pub fn register_failure(&self, state: LoginState, now: DateTime<Utc>) -> Result<LoginState> {
        let attempts = state.failed_attempts.max(0).saturating_add(1);
        let threshold = i32::try_from(self.threshold).unwrap_or(i32::MAX);
        if attempts >= threshold {
            let until = now
                .checked_add_signed(self.duration)
                .ok_or_else(|| anyhow!("lockout duration out of range"))?;
            Ok(LoginState {
                failed_attempts: 0,
                lock_until: Some(until),
            })
        } else {
            Ok(LoginState {
                failed_attempts: attempts,
                lock_until: state.lock_until,
            })
        }
    }

    /// Successful login: the counter resets, an elapsed lock is left in place.
    #[must_use]
    pub fn register_success(&self, state: LoginState) -> LoginState {
        LoginState {
            failed_attempts: 0,
            lock_until: state.lock_until,
        }
    }
}
