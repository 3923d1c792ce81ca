//! API handlers for knowyourhero.
//!
//! Every fallible handler returns `Result<_, AuthError>`; the error side is
//! rendered by [`error`] as `{"error": {"code", "message"}}`.

pub mod auth;
pub mod error;
pub mod health;
pub mod me;
pub mod reviews;
pub mod root;
pub mod users;
