//! API handlers and shared utilities for BuildMart.
//!
//! This module organizes the service's route handlers and provides common
//! functions for validation and time handling.

pub mod activity;
pub mod admin;
pub mod auth;
pub mod contacts;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use regex::Regex;
use std::time::SystemTime;

/// Lightweight email sanity check used by handlers before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Unix seconds for token TTL validation.
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_simple() {
        assert!(valid_email("user@example.com"));
    }

    #[test]
    fn valid_email_rejects_missing_at() {
        assert!(!valid_email("user.example.com"));
    }

    #[test]
    fn valid_email_rejects_missing_domain() {
        assert!(!valid_email("user@"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Bob@BuildMart.DEV "), "bob@buildmart.dev");
    }

    #[test]
    fn now_unix_seconds_is_recent() {
        // Well past 2023-01-01; sanity check the clock plumbing.
        assert!(now_unix_seconds() > 1_672_531_200);
    }
}
