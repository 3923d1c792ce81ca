//! Auth handlers: registration, login, refresh and logout.
//!
//! ## Cookies
//!
//! Both tokens travel as `HttpOnly; SameSite=Lax` cookies scoped to `/`:
//!
//! - **`access_token`:** `Max-Age` is the access token TTL. Also accepted as
//!   `Authorization: Bearer <token>`.
//! - **`refresh_token`:** `Max-Age` is the refresh token TTL. Only read by
//!   `/api/auth/refresh` and `/api/auth/logout`.
//!
//! `Secure` is added when the configured frontend base URL is `https`. Logout
//! always expires both cookies (`Max-Age=0`).

pub(crate) mod cookies;
pub mod login;
pub(crate) mod principal;
pub mod register;
pub mod session;
pub(crate) mod types;
