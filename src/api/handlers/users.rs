//! Admin user management: listing and role promotion.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::activity;
use crate::api::handlers::auth::storage::{list_users, promote_user};
use crate::api::handlers::auth::types::UserResponse;
use crate::api::handlers::auth::{require_admin, AuthState};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    pub user_id: String,
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users, password hashes excluded", body = [UserResponse]),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_all_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;
    let users = list_users(&pool).await?;
    let users: Vec<UserResponse> = users.iter().map(|user| user.to_response()).collect();
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/api/users/promote",
    request_body = PromoteRequest,
    responses(
        (status = 200, description = "User promoted to admin"),
        (status = 400, description = "Malformed user id", body = String),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String),
        (status = 404, description = "User not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn promote(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PromoteRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&headers, &pool, &auth_state).await?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let user_id = Uuid::parse_str(&request.user_id)
        .map_err(|_| ApiError::Validation("Malformed user id".to_string()))?;

    let user = promote_user(&pool, user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    activity::record(
        &pool,
        Some(principal.user.id),
        "PROMOTE_ADMIN",
        json!({ "promotedUser": user_id.to_string() }),
    )
    .await;

    Ok(Json(json!({
        "message": "User promoted to admin",
        "user": user.to_response(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_request_uses_camel_case() {
        let request: PromoteRequest =
            serde_json::from_value(json!({ "userId": "abc" })).unwrap();
        assert_eq!(request.user_id, "abc");
    }
}
