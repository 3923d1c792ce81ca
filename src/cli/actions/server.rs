use crate::{
    api,
    auth::{AuthConfig, SessionManager, token::TokenCodec},
    store::{MemoryStore, PgStore, Store},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// DSN selecting the in-process store.
pub const MEMORY_DSN: &str = "memory://";

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub frontend_base_url: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub lockout_attempts: u32,
    pub lockout_duration_seconds: i64,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.frontend_base_url.clone())
            .with_access_token_ttl_seconds(self.access_token_ttl_seconds)
            .with_refresh_token_ttl_seconds(self.refresh_token_ttl_seconds)
            .with_lockout_attempts(self.lockout_attempts)
            .with_lockout_duration_seconds(self.lockout_duration_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = connect(&args.dsn).await?;
    let config = args.auth_config();
    let codec = TokenCodec::new(&args.jwt_secret);
    let sessions = Arc::new(SessionManager::new(store, codec, config));

    api::new(args.port, sessions).await
}

async fn connect(dsn: &str) -> Result<Arc<dyn Store>> {
    if dsn == MEMORY_DSN {
        warn!("Using the in-memory store, all data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    info!("Connected to database");

    Ok(Arc::new(PgStore::new(pool)))
}
