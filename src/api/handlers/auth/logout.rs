//! Logout endpoint: revoke the refresh token and clear its cookie.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::handlers::activity;

use super::principal::require_auth;
use super::session::{clear_refresh_cookie, extract_refresh_token};
use super::state::AuthState;
use super::storage::delete_refresh_token;
use super::utils::hash_refresh_token;

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logged out; refresh token revoked"),
        (status = 401, description = "Missing or invalid access token", body = String)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;

    if let Some(refresh) = extract_refresh_token(&headers) {
        delete_refresh_token(&pool, &hash_refresh_token(&refresh)).await?;
    }

    activity::record(&pool, Some(principal.user.id), "LOGOUT", json!({})).await;

    // Always clear the cookie, even if no refresh token row existed.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_refresh_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    Ok((
        response_headers,
        Json(json!({ "message": "Logged out successfully" })),
    ))
}
