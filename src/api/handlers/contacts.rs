//! Contact inquiries: public submission, admin-only inbox management.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::auth::{require_admin, AuthState};
use crate::api::handlers::{activity, normalize_email, valid_email};

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Read,
    Unread,
}

impl ContactStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Unread => "unread",
        }
    }

    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "read" => Self::Read,
            _ => Self::Unread,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ContactStatusRequest {
    pub status: ContactStatus,
}

fn validate(request: &ContactRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    if !valid_email(&normalize_email(&request.email)) {
        return Err(ApiError::Validation("Valid email is required".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(ApiError::Validation("Phone number is required".to_string()));
    }
    if request.message.trim().is_empty() {
        return Err(ApiError::Validation("Message is required".to_string()));
    }
    Ok(())
}

const CONTACT_COLUMNS: &str = "id, name, email, phone, message, status, \
     EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix";

fn contact_from_row(row: &sqlx::postgres::PgRow) -> ContactMessage {
    ContactMessage {
        id: row.get::<Uuid, _>("id").to_string(),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        message: row.get("message"),
        status: ContactStatus::from_db(row.get::<String, _>("status").as_str()),
        created_at: row.get("created_at_unix"),
    }
}

async fn insert_contact(pool: &PgPool, request: &ContactRequest) -> Result<ContactMessage> {
    let query = format!(
        "INSERT INTO contact_messages (name, email, phone, message) \
         VALUES ($1, $2, $3, $4) RETURNING {CONTACT_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(request.name.trim())
        .bind(normalize_email(&request.email))
        .bind(request.phone.trim())
        .bind(request.message.trim())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert contact message")?;
    Ok(contact_from_row(&row))
}

pub(crate) async fn all_contacts(pool: &PgPool) -> Result<Vec<ContactMessage>> {
    let query = format!("SELECT {CONTACT_COLUMNS} FROM contact_messages ORDER BY created_at DESC");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list contact messages")?;
    Ok(rows.iter().map(contact_from_row).collect())
}

async fn set_contact_status(
    pool: &PgPool,
    id: Uuid,
    status: ContactStatus,
) -> Result<Option<ContactMessage>> {
    let query = format!(
        "UPDATE contact_messages SET status = $2 WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update contact status")?;
    Ok(row.map(|row| contact_from_row(&row)))
}

async fn delete_contact_row(pool: &PgPool, id: Uuid) -> Result<bool> {
    let query = "DELETE FROM contact_messages WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete contact message")?;
    Ok(result.rows_affected() > 0)
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Inquiry submitted", body = ContactMessage),
        (status = 400, description = "Validation failed", body = String)
    ),
    tag = "contacts"
)]
pub async fn submit_contact(
    pool: Extension<PgPool>,
    payload: Option<Json<ContactRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    validate(&request)?;

    let contact = insert_contact(&pool, &request).await?;
    activity::record(&pool, None, "NEW_CONTACT", json!({ "contactId": contact.id })).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Inquiry submitted successfully",
            "contact": contact,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/contacts",
    responses(
        (status = 200, description = "All inquiries, newest first", body = [ContactMessage]),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String)
    ),
    security(("bearer" = [])),
    tag = "contacts"
)]
pub async fn list_contacts(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;
    let contacts = all_contacts(&pool).await?;
    Ok(Json(contacts))
}

#[utoipa::path(
    put,
    path = "/api/contacts/{id}/status",
    params(("id" = String, Path, description = "Inquiry id")),
    request_body = ContactStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ContactMessage),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String),
        (status = 404, description = "Inquiry not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "contacts"
)]
pub async fn update_contact_status(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ContactStatusRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&headers, &pool, &auth_state).await?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let contact = set_contact_status(&pool, id, request.status)
        .await?
        .ok_or(ApiError::NotFound("Inquiry"))?;

    activity::record(
        &pool,
        Some(principal.user.id),
        "UPDATE_CONTACT_STATUS",
        json!({ "contactId": id.to_string(), "newStatus": request.status.as_str() }),
    )
    .await;

    Ok(Json(contact))
}

#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    params(("id" = String, Path, description = "Inquiry id")),
    responses(
        (status = 200, description = "Inquiry deleted"),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String),
        (status = 404, description = "Inquiry not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "contacts"
)]
pub async fn delete_contact(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&headers, &pool, &auth_state).await?;

    if !delete_contact_row(&pool, id).await? {
        return Err(ApiError::NotFound("Inquiry"));
    }

    activity::record(
        &pool,
        Some(principal.user.id),
        "DELETE_CONTACT",
        json!({ "contactId": id.to_string() }),
    )
    .await;

    Ok(Json(json!({ "message": "Inquiry deleted successfully" })))
}
