//! Admin dashboard endpoints: role verification, aggregate stats, and
//! section data for the dashboard views.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::handlers::auth::storage::list_users;
use crate::api::handlers::auth::types::{Role, UserResponse};
use crate::api::handlers::auth::{require_admin, require_auth, AuthState};
use crate::api::handlers::orders::{
    all_orders, count_rows, recent_orders, total_sales, Order, OrderCountTable,
};
use crate::api::handlers::{contacts, products};

const RECENT_ORDERS_LIMIT: i64 = 10;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_sales: f64,
    pub total_orders: i64,
    pub total_products: i64,
    pub active_users: i64,
    pub recent_orders: Vec<Order>,
}

#[utoipa::path(
    get,
    path = "/api/verify-admin",
    responses(
        (status = 200, description = "Caller is an admin"),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn verify_admin(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, &pool, &auth_state).await?;
    if principal.user.role != Role::Admin {
        // 403 with an explicit flag; the client keeps its credentials.
        return Ok((
            axum::http::StatusCode::FORBIDDEN,
            Json(json!({ "isAdmin": false, "message": "User is not an admin" })),
        ));
    }
    Ok((
        axum::http::StatusCode::OK,
        Json(json!({ "isAdmin": true, "user": principal.user.to_response() })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/dashboard-stats",
    responses(
        (status = 200, description = "Aggregate storefront stats", body = DashboardStats),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn dashboard_stats(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;

    let stats = DashboardStats {
        total_sales: total_sales(&pool).await?,
        total_orders: count_rows(&pool, OrderCountTable::Orders).await?,
        total_products: count_rows(&pool, OrderCountTable::Products).await?,
        active_users: count_rows(&pool, OrderCountTable::Users).await?,
        recent_orders: recent_orders(&pool, RECENT_ORDERS_LIMIT).await?,
    };

    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/admin/{section}",
    params(("section" = String, Path, description = "products | orders | users | settings")),
    responses(
        (status = 200, description = "Section data for the dashboard"),
        (status = 400, description = "Unknown section", body = String),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn section_data(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(section): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;

    let data = match section.as_str() {
        "products" => serde_json::to_value(products::all_products(&pool).await?),
        "orders" => serde_json::to_value(all_orders(&pool).await?),
        "users" => {
            let users: Vec<UserResponse> = list_users(&pool)
                .await?
                .iter()
                .map(|user| user.to_response())
                .collect();
            serde_json::to_value(users)
        }
        "contacts" => serde_json::to_value(contacts::all_contacts(&pool).await?),
        // The dashboard has no persisted settings yet; keep the shape stable.
        "settings" => Ok(json!({})),
        _ => return Err(ApiError::Validation("Invalid section".to_string())),
    }
    .map_err(|err| ApiError::Internal(err.into()))?;

    Ok(Json(data))
}
