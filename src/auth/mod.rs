//! Authentication and session lifecycle.
//!
//! [`SessionManager`] is the entry point. It ties together the credential store,
//! the password hasher, the token codec, the refresh token ledger and the lockout
//! policy; every mutating operation runs inside one store transaction.
//!
//! ## Token rotation
//!
//! - **Login:** revokes every refresh token the user still holds, then issues and
//!   records a new pair.
//! - **Refresh:** the presented token must exist in the ledger, match its stored
//!   hash and not be revoked. It is revoked with a compare-and-swap update and a
//!   new pair is recorded in the same transaction.
//! - **Logout:** best-effort revoke. Never fails.
//!
//! > **Note:** A revoked refresh token presented again is logged at WARN as a
//! > possible replay. The rest of the chain is left untouched.

pub mod access;
mod config;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod lockout;
pub mod password;
pub mod session;
pub mod token;
pub(crate) mod utils;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

pub use config::{AuthConfig, MAX_DURATION_SECONDS};
pub use error::AuthError;
pub use session::{LogoutOutcome, Principal, SessionManager, TokenPair};

/// User role, from least to most restricted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperReviewer,
    Reviewer,
    #[default]
    Colleague,
    Guest,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperReviewer => "super_reviewer",
            Self::Reviewer => "reviewer",
            Self::Colleague => "colleague",
            Self::Guest => "guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super_reviewer" => Ok(Self::SuperReviewer),
            "reviewer" => Ok(Self::Reviewer),
            "colleague" => Ok(Self::Colleague),
            "guest" => Ok(Self::Guest),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}
