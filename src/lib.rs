//! # BuildMart (Storefront API)
//!
//! `buildmart` is the REST backend for the BuildMart construction-materials
//! storefront. It serves the public catalog and contact form, the customer
//! auth flow, and the admin dashboard.
//!
//! ## Authentication
//!
//! Authentication is stateless per request: clients present a short-lived
//! HS256 access token in the `Authorization` header. A longer-lived refresh
//! token, persisted server-side by hash and carried in an `HttpOnly` cookie,
//! mints new access tokens without credential re-entry. Deleting the stored
//! row revokes the session.
//!
//! ## Authorization
//!
//! Access is controlled by a coarse role (`user` or `admin`). Admin-only
//! endpoints reject non-admin identities with `403 Forbidden`; invalid or
//! expired tokens yield `401 Unauthorized`.
//!
//! The [`client`] module provides a session manager for programs consuming
//! this API: it stores the current access token, refreshes it proactively
//! before expiry, and retries once on `401`.

pub mod api;
pub mod cli;
pub mod client;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
