//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        frontend_base_url: auth_opts.frontend_base_url,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        refresh_token_ttl_seconds: auth_opts.refresh_token_ttl_seconds,
        lockout_attempts: auth_opts.lockout_attempts,
        lockout_duration_seconds: auth_opts.lockout_duration_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("KYH_PORT", Some("8081")),
                ("KYH_DSN", Some("memory://")),
                ("KYH_JWT_SECRET", Some(SECRET)),
                ("KYH_ACCESS_TOKEN_TTL_SECONDS", Some("60")),
                ("KYH_REFRESH_TOKEN_TTL_SECONDS", Some("3600")),
                ("KYH_LOCKOUT_ATTEMPTS", Some("3")),
                ("KYH_LOCKOUT_DURATION_SECONDS", Some("120")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["knowyourhero"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8081);
                    assert_eq!(args.dsn, "memory://");
                    assert_eq!(args.jwt_secret.expose_secret(), SECRET);
                    assert_eq!(args.access_token_ttl_seconds, 60);
                    assert_eq!(args.refresh_token_ttl_seconds, 3600);
                    assert_eq!(args.lockout_attempts, 3);
                    assert_eq!(args.lockout_duration_seconds, 120);
                }
            },
        );
    }

    #[test]
    fn short_jwt_secret_rejected() {
        temp_env::with_vars(
            [
                ("KYH_DSN", Some("memory://")),
                ("KYH_JWT_SECRET", Some("too-short")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["knowyourhero"]);
                let err = handler(&matches).err().map(|e| e.to_string());
                assert_eq!(
                    err.as_deref(),
                    Some("--jwt-secret must be at least 32 bytes")
                );
            },
        );
    }
}
