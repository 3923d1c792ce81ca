use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::auth::MAX_DURATION_SECONDS;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL_SECONDS: &str = "refresh-token-ttl-seconds";
pub const ARG_LOCKOUT_ATTEMPTS: &str = "lockout-attempts";
pub const ARG_LOCKOUT_DURATION_SECONDS: &str = "lockout-duration-seconds";

/// Minimum HS256 key length, matching the SHA-256 output size.
const MIN_JWT_SECRET_BYTES: usize = 32;

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_lockout_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign access and refresh tokens (min 32 bytes)")
                .env("KYH_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL, used as the CORS origin and to decide Secure cookies")
                .env("KYH_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Access token TTL in seconds")
                .env("KYH_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_DURATION_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .long(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .help("Refresh token TTL in seconds")
                .env("KYH_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_DURATION_SECONDS)),
        )
}

fn with_lockout_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOCKOUT_ATTEMPTS)
                .long(ARG_LOCKOUT_ATTEMPTS)
                .help("Consecutive failed logins before the account is locked")
                .env("KYH_LOCKOUT_ATTEMPTS")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_DURATION_SECONDS)
                .long(ARG_LOCKOUT_DURATION_SECONDS)
                .help("How long a locked account stays locked, in seconds")
                .env("KYH_LOCKOUT_DURATION_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_DURATION_SECONDS)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub frontend_base_url: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub lockout_attempts: u32,
    pub lockout_duration_seconds: i64,
}

impl Options {
    /// Extract the auth options from validated matches.
    ///
    /// # Errors
    /// Returns an error if the JWT secret is missing or too short.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .context("missing required argument: --jwt-secret")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(anyhow!(
                "--{ARG_JWT_SECRET} must be at least {MIN_JWT_SECRET_BYTES} bytes"
            ));
        }

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret.clone()),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing argument: --frontend-base-url")?,
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(300),
            refresh_token_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(86_400),
            lockout_attempts: matches
                .get_one::<u32>(ARG_LOCKOUT_ATTEMPTS)
                .copied()
                .unwrap_or(10),
            lockout_duration_seconds: matches
                .get_one::<i64>(ARG_LOCKOUT_DURATION_SECONDS)
                .copied()
                .unwrap_or(300),
        })
    }
}
