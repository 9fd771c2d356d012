//! Login endpoint.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::handlers::{normalize_email, now_unix_seconds};

use super::password::verify_password;
use super::session::refresh_cookie;
use super::state::AuthState;
use super::storage::{insert_refresh_token, lookup_user_by_email};
use super::types::{AuthResponse, LoginRequest};
use super::utils::hash_refresh_token;

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    debug!("login attempt for {email}");

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = lookup_user_by_email(&pool, &email)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify_password(&user.password_hash, &request.password) {
        return Err(ApiError::Unauthenticated);
    }

    let now = now_unix_seconds();
    let access_token = auth_state
        .issuer()
        .access_token(user.id, now)
        .map_err(|err| ApiError::Internal(err.into()))?;

    let (refresh_token, expires_at) = auth_state
        .issuer()
        .refresh_token(user.id, now)
        .map_err(|err| ApiError::Internal(err.into()))?;
    insert_refresh_token(&pool, &hash_refresh_token(&refresh_token), user.id, expires_at).await?;

    let mut headers = HeaderMap::new();
    let cookie = refresh_cookie(auth_state.config(), &refresh_token)
        .map_err(|err| ApiError::Internal(err.into()))?;
    headers.insert(SET_COOKIE, cookie);

    let response = AuthResponse {
        user: user.to_response(),
        token: format!("Bearer {access_token}"),
    };
    Ok((StatusCode::OK, headers, Json(response)))
}
