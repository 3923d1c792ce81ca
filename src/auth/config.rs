use chrono::Duration;

use super::lockout::{DEFAULT_DURATION_SECONDS, DEFAULT_THRESHOLD};

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Upper bound accepted from configuration for TTLs and lock durations (ten years).
pub const MAX_DURATION_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    lockout_attempts: u32,
    lockout_duration_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            lockout_attempts: DEFAULT_THRESHOLD,
            lockout_duration_seconds: DEFAULT_DURATION_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_attempts(mut self, attempts: u32) -> Self {
        self.lockout_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_duration_seconds(mut self, seconds: i64) -> Self {
        self.lockout_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    #[must_use]
    pub fn lockout_attempts(&self) -> u32 {
        self.lockout_attempts
    }

    #[must_use]
    pub fn lockout_duration_seconds(&self) -> i64 {
        self.lockout_duration_seconds
    }

    pub(crate) fn access_token_ttl(&self) -> Duration {
        seconds(self.access_token_ttl_seconds)
    }

    pub(crate) fn refresh_token_ttl(&self) -> Duration {
        seconds(self.refresh_token_ttl_seconds)
    }

    pub(crate) fn lockout_duration(&self) -> Duration {
        seconds(self.lockout_duration_seconds)
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Out-of-range values saturate; adding them to a timestamp then fails with
/// an error instead of panicking.
fn seconds(value: i64) -> Duration {
    Duration::try_seconds(value).unwrap_or(if value < 0 { Duration::MIN } else { Duration::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        assert_eq!(config.access_token_ttl_seconds(), 300);
        assert_eq!(config.refresh_token_ttl_seconds(), 86_400);
        assert_eq!(config.lockout_attempts(), 10);
        assert_eq!(config.lockout_duration_seconds(), 300);
        assert!(!config.cookie_secure());
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new("https://knowyourhero.dev".to_string())
            .with_access_token_ttl_seconds(60)
            .with_refresh_token_ttl_seconds(120)
            .with_lockout_attempts(3)
            .with_lockout_duration_seconds(30);
        assert_eq!(config.access_token_ttl(), Duration::seconds(60));
        assert_eq!(config.refresh_token_ttl(), Duration::seconds(120));
        assert_eq!(config.lockout_attempts(), 3);
        assert_eq!(config.lockout_duration_seconds(), 30);
        assert!(config.cookie_secure());
        assert_eq!(config.frontend_base_url(), "https://knowyourhero.dev");
    }

    #[test]
    fn huge_durations_saturate() {
        let config = AuthConfig::new("http://localhost:5173".to_string())
            .with_refresh_token_ttl_seconds(i64::MAX)
            .with_lockout_duration_seconds(i64::MAX)
            .with_access_token_ttl_seconds(i64::MIN);
        assert_eq!(config.refresh_token_ttl(), Duration::MAX);
        assert_eq!(config.lockout_duration(), Duration::MAX);
        assert_eq!(config.access_token_ttl(), Duration::MIN);
    }
}
