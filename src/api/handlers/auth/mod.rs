//! Authentication and session management.
//!
//! Login and registration mint a short-lived access token plus a persisted,
//! cookie-carried refresh token. Every protected handler resolves the access
//! token through [`principal::require_auth`] (or [`principal::require_admin`]
//! for role-gated routes); the refresh endpoint exchanges a live refresh
//! token for a new access token without credential re-entry.

pub mod login;
pub mod logout;
pub mod password;
pub mod principal;
pub mod refresh;
pub mod register;
pub(crate) mod session;
pub mod state;
pub mod storage;
pub mod token;
pub mod types;
pub(crate) mod utils;

pub use principal::{require_admin, require_auth, Principal};
pub use state::{AuthConfig, AuthState};
