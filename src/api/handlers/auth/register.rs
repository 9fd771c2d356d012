//! Registration endpoint.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::handlers::{activity, normalize_email, now_unix_seconds, valid_email};

use super::password::{hash_password, MIN_PASSWORD_LENGTH};
use super::session::refresh_cookie;
use super::state::AuthState;
use super::storage::{insert_refresh_token, insert_user, SignupOutcome};
use super::types::{AuthResponse, RegisterRequest};
use super::utils::hash_refresh_token;

fn validate(request: &RegisterRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    if !valid_email(&normalize_email(&request.email)) {
        return Err(ApiError::Validation("Valid email is required".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Validation failed or email already registered", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    validate(&request)?;

    let email = normalize_email(&request.email);
    let password_hash = hash_password(&request.password)?;

    let user = match insert_user(&pool, request.name.trim(), &email, &password_hash).await? {
        SignupOutcome::Created(user) => user,
        SignupOutcome::Conflict => {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }
    };

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

    activity::record(&pool, Some(user.id), "REGISTER", json!({ "email": email })).await;

    let mut headers = HeaderMap::new();
    let cookie = refresh_cookie(auth_state.config(), &refresh_token)
        .map_err(|err| ApiError::Internal(err.into()))?;
    headers.insert(SET_COOKIE, cookie);

    let response = AuthResponse {
        user: user.to_response(),
        token: format!("Bearer {access_token}"),
    };
    Ok((StatusCode::CREATED, headers, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn validate_accepts_well_formed() {
        assert!(validate(&request("Bob", "bob@buildmart.dev", "hunter22")).is_ok());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let err = validate(&request("  ", "bob@buildmart.dev", "hunter22")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn validate_rejects_bad_email() {
        let err = validate(&request("Bob", "not-an-email", "hunter22")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn validate_rejects_short_password() {
        let err = validate(&request("Bob", "bob@buildmart.dev", "abc")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
