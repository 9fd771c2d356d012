//! Best-effort activity audit log.

use anyhow::{Context, Result};
use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::auth::{require_admin, AuthState};

const RECENT_LIMIT: i64 = 100;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    #[schema(value_type = Object)]
    pub details: Value,
    pub created_at: i64,
}

/// Record an activity row. Logging failures are reported and swallowed;
/// the calling request must not fail because the audit insert did.
pub async fn record(pool: &PgPool, user_id: Option<Uuid>, action: &str, details: Value) {
    if let Err(err) = insert_activity(pool, user_id, action, &details).await {
        error!("Activity logging failed: {err:#}");
    }
}

async fn insert_activity(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    details: &Value,
) -> Result<()> {
    let payload_text = serde_json::to_string(details).context("failed to serialize details")?;

    let query = r"
        INSERT INTO activities (user_id, action, details)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(action)
        .bind(payload_text)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert activity")?;
    Ok(())
}

async fn recent_activities(pool: &PgPool) -> Result<Vec<ActivityEntry>> {
    let query = r"
        SELECT id, user_id, action, details::text AS details,
               EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
        FROM activities
        ORDER BY created_at DESC
        LIMIT $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(RECENT_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list activities")?;

    Ok(rows
        .iter()
        .map(|row| {
            let details: String = row.get("details");
            ActivityEntry {
                id: row.get::<Uuid, _>("id").to_string(),
                user_id: row.get::<Option<Uuid>, _>("user_id").map(|id| id.to_string()),
                action: row.get("action"),
                details: serde_json::from_str(&details).unwrap_or(Value::Null),
                created_at: row.get("created_at_unix"),
            }
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/activities",
    responses(
        (status = 200, description = "Most recent activity entries", body = [ActivityEntry]),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_activities(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;
    let activities = recent_activities(&pool).await?;
    Ok(Json(activities))
}
