//! Authenticated principal extraction and authorization guards.
//!
//! Flow Overview: read the bearer credential, verify signature and expiry,
//! resolve the embedded user id against the store, and return a principal
//! that downstream handlers can use. Admin-only handlers layer a role check
//! on top of the same primitive; there is no second token-parsing path.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::PgPool;

use crate::api::error::ApiError;
use crate::api::handlers::now_unix_seconds;

use super::state::AuthState;
use super::storage::{lookup_user_by_id, UserRecord};
use super::types::Role;

/// Authenticated user context derived from the access token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: UserRecord,
    pub token: String,
}

/// Read the bearer credential from the authorization header.
///
/// Tolerates `Bearer <token>`, a missing space after the label, and a bare
/// token value; stored tokens in the wild carry all three shapes.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .or_else(|| trimmed.strip_prefix("Bearer"))
        .map_or(trimmed, str::trim);
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the access token into a principal, or fail `Unauthenticated`.
///
/// # Errors
///
/// `Unauthenticated` for a missing/invalid/expired token or a user id that
/// no longer resolves; `Internal` only for storage failures.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;

    let (user_id, _claims) = auth_state
        .issuer()
        .verify(&token, now_unix_seconds())
        .map_err(|_| ApiError::Unauthenticated)?;

    let user = lookup_user_by_id(pool, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Principal { user, token })
}

/// [`require_auth`] plus an admin role check.
///
/// # Errors
///
/// Everything `require_auth` returns, plus `Forbidden` for non-admin users.
pub async fn require_admin(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, ApiError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    ensure_admin(&principal)?;
    Ok(principal)
}

fn ensure_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.user.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_accepts_prefixed() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn bearer_token_accepts_lowercase_prefix() {
        let headers = headers_with_auth("bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn bearer_token_accepts_missing_space() {
        let headers = headers_with_auth("Bearerabc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn bearer_token_accepts_bare_value() {
        let headers = headers_with_auth("abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn bearer_token_rejects_empty() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers_with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with_auth("   ")), None);
    }

    fn principal_with_role(role: Role) -> Principal {
        Principal {
            user: UserRecord {
                id: uuid::Uuid::nil(),
                name: "Bob".to_string(),
                email: "bob@buildmart.dev".to_string(),
                password_hash: String::new(),
                role,
                created_at_unix: 0,
            },
            token: "token".to_string(),
        }
    }

    #[test]
    fn ensure_admin_rejects_regular_users() {
        assert!(ensure_admin(&principal_with_role(Role::Admin)).is_ok());
        let err = ensure_admin(&principal_with_role(Role::User)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }
}
