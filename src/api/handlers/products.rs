//! Product catalog: public reads, admin-only writes.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::auth::{require_admin, AuthState};

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update; absent fields keep their stored values.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

fn validate_create(request: &CreateProductRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Product name is required".to_string()));
    }
    if request.category.trim().is_empty() {
        return Err(ApiError::Validation("Category is required".to_string()));
    }
    if request.price < 0.0 {
        return Err(ApiError::Validation("Price must not be negative".to_string()));
    }
    if request.stock < 0 {
        return Err(ApiError::Validation("Stock must not be negative".to_string()));
    }
    Ok(())
}

const PRODUCT_COLUMNS: &str = "id, name, category, price, stock, description, image_url, \
     EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix";

fn product_from_row(row: &sqlx::postgres::PgRow) -> Product {
    Product {
        id: row.get::<Uuid, _>("id").to_string(),
        name: row.get("name"),
        category: row.get("category"),
        price: row.get("price"),
        stock: row.get("stock"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at_unix"),
    }
}

pub(crate) async fn all_products(pool: &PgPool) -> Result<Vec<Product>> {
    let query = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC");
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
        .context("failed to list products")?;
    Ok(rows.iter().map(product_from_row).collect())
}

async fn product_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Product>> {
    let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch product")?;
    Ok(row.map(|row| product_from_row(&row)))
}

async fn insert_product(pool: &PgPool, request: &CreateProductRequest) -> Result<Product> {
    let query = format!(
        "INSERT INTO products (name, category, price, stock, description, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(request.name.trim())
        .bind(request.category.trim())
        .bind(request.price)
        .bind(request.stock)
        .bind(request.description.as_deref())
        .bind(request.image_url.as_deref())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert product")?;
    Ok(product_from_row(&row))
}

async fn update_product_row(
    pool: &PgPool,
    id: Uuid,
    request: &UpdateProductRequest,
) -> Result<Option<Product>> {
    let query = format!(
        "UPDATE products SET \
            name = COALESCE($2, name), \
            category = COALESCE($3, category), \
            price = COALESCE($4, price), \
            stock = COALESCE($5, stock), \
            description = COALESCE($6, description), \
            image_url = COALESCE($7, image_url) \
         WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(request.name.as_deref())
        .bind(request.category.as_deref())
        .bind(request.price)
        .bind(request.stock)
        .bind(request.description.as_deref())
        .bind(request.image_url.as_deref())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update product")?;
    Ok(row.map(|row| product_from_row(&row)))
}

async fn delete_product_row(pool: &PgPool, id: Uuid) -> Result<bool> {
    let query = "DELETE FROM products WHERE id = $1";
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
        .context("failed to delete product")?;
    Ok(result.rows_affected() > 0)
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "All products, newest first", body = [Product])
    ),
    tag = "products"
)]
pub async fn list_products(pool: Extension<PgPool>) -> Result<impl IntoResponse, ApiError> {
    let products = all_products(&pool).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = Product),
        (status = 404, description = "Product not found", body = String)
    ),
    tag = "products"
)]
pub async fn get_product(
    pool: Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = product_by_id(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation failed", body = String),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String)
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn create_product(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateProductRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    validate_create(&request)?;
    let product = insert_product(&pool, &request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String),
        (status = 404, description = "Product not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn update_product(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<UpdateProductRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let product = update_product_row(&pool, id, &request)
        .await?
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Admin access required", body = String),
        (status = 404, description = "Product not found", body = String)
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn delete_product(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, &pool, &auth_state).await?;
    if !delete_product_row(&pool, id).await? {
        return Err(ApiError::NotFound("Product"));
    }
    Ok(Json(
        serde_json::json!({ "message": "Product deleted successfully" }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateProductRequest {
        CreateProductRequest {
            name: "Cement 25kg".to_string(),
            category: "cement".to_string(),
            price: 9.5,
            stock: 120,
            description: None,
            image_url: None,
        }
    }

    #[test]
    fn validate_create_accepts_well_formed() {
        assert!(validate_create(&create_request()).is_ok());
    }

    #[test]
    fn validate_create_rejects_blank_name_and_category() {
        let mut request = create_request();
        request.name = " ".to_string();
        assert!(validate_create(&request).is_err());

        let mut request = create_request();
        request.category = String::new();
        assert!(validate_create(&request).is_err());
    }

    #[test]
    fn validate_create_rejects_negative_price_or_stock() {
        let mut request = create_request();
        request.price = -1.0;
        assert!(validate_create(&request).is_err());

        let mut request = create_request();
        request.stock = -1;
        assert!(validate_create(&request).is_err());
    }

    #[test]
    fn update_request_defaults_to_no_changes() {
        let request = UpdateProductRequest::default();
        assert!(request.name.is_none());
        assert!(request.price.is_none());
    }
}
