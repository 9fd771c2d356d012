//! Refresh endpoint: exchange a live refresh token for a new access token.
//!
//! The refresh token moves through `presented -> verified -> matched ->
//! rotated`: the cookie value is verified cryptographically, then matched
//! against its persisted row (a deleted row means the session was revoked),
//! and only then is a fresh access token minted. The refresh token itself is
//! reused until its own expiry; it is never rotated here.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::handlers::now_unix_seconds;

use super::session::extract_refresh_token;
use super::state::AuthState;
use super::storage::match_refresh_token;
use super::types::RefreshResponse;
use super::utils::hash_refresh_token;

#[utoipa::path(
    post,
    path = "/api/refresh-token",
    responses(
        (status = 200, description = "Fresh access token", body = RefreshResponse),
        (status = 401, description = "Missing, invalid, or revoked refresh token", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_refresh_token(&headers).ok_or(ApiError::Unauthenticated)?;

    let now = now_unix_seconds();
    let (user_id, _claims) = auth_state
        .issuer()
        .verify(&token, now)
        .map_err(|err| {
            debug!("refresh token verification failed: {err}");
            ApiError::Unauthenticated
        })?;

    let live = match_refresh_token(&pool, &hash_refresh_token(&token), user_id).await?;
    if !live {
        return Err(ApiError::Unauthenticated);
    }

    let access_token = auth_state
        .issuer()
        .access_token(user_id, now)
        .map_err(|err| ApiError::Internal(err.into()))?;

    Ok(Json(RefreshResponse {
        token: access_token,
        expires_in: auth_state.issuer().access_ttl_seconds(),
    }))
}
