//! Orders: admin visibility and dashboard aggregates.
//!
//! Orders enter the store through fulfillment tooling, not this API; the
//! storefront only exposes them to the admin dashboard.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub product_id: Option<String>,
    pub customer_name: String,
    pub product_name: String,
    pub quantity: i32,
    pub amount: f64,
    pub status: OrderStatus,
    pub created_at: i64,
}

const ORDER_COLUMNS: &str = "id, user_id, product_id, customer_name, product_name, quantity, \
     amount, status, EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix";

fn order_from_row(row: &sqlx::postgres::PgRow) -> Order {
    Order {
        id: row.get::<Uuid, _>("id").to_string(),
        user_id: row.get::<Option<Uuid>, _>("user_id").map(|id| id.to_string()),
        product_id: row
            .get::<Option<Uuid>, _>("product_id")
            .map(|id| id.to_string()),
        customer_name: row.get("customer_name"),
        product_name: row.get("product_name"),
        quantity: row.get("quantity"),
        amount: row.get("amount"),
        status: OrderStatus::from_db(row.get::<String, _>("status").as_str()),
        created_at: row.get("created_at_unix"),
    }
}

pub(crate) async fn all_orders(pool: &PgPool) -> Result<Vec<Order>> {
    let query = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
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
        .context("failed to list orders")?;
    Ok(rows.iter().map(order_from_row).collect())
}

pub(crate) async fn recent_orders(pool: &PgPool, limit: i64) -> Result<Vec<Order>> {
    let query = format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list recent orders")?;
    Ok(rows.iter().map(order_from_row).collect())
}

pub(crate) async fn total_sales(pool: &PgPool) -> Result<f64> {
    let query = "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION AS total FROM orders";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to sum order amounts")?;
    Ok(row.get("total"))
}

pub(crate) async fn count_rows(pool: &PgPool, table: OrderCountTable) -> Result<i64> {
    let query = match table {
        OrderCountTable::Orders => "SELECT COUNT(*) AS total FROM orders",
        OrderCountTable::Products => "SELECT COUNT(*) AS total FROM products",
        OrderCountTable::Users => "SELECT COUNT(*) AS total FROM users",
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count rows")?;
    Ok(row.get("total"))
}

/// Tables counted for the dashboard. Keeping this an enum keeps the count
/// query free of interpolated identifiers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OrderCountTable {
    Orders,
    Products,
    Users,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_from_db_covers_all_states() {
        assert_eq!(OrderStatus::from_db("pending"), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_db("processing"), OrderStatus::Processing);
        assert_eq!(OrderStatus::from_db("shipped"), OrderStatus::Shipped);
        assert_eq!(OrderStatus::from_db("delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_db("cancelled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_db("unknown"), OrderStatus::Pending);
    }

    #[test]
    fn order_serializes_camel_case() {
        let order = Order {
            id: "id".to_string(),
            user_id: None,
            product_id: None,
            customer_name: "Ada".to_string(),
            product_name: "Cement 25kg".to_string(),
            quantity: 3,
            amount: 28.5,
            status: OrderStatus::Pending,
            created_at: 1_700_000_000,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["customerName"], "Ada");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["createdAt"], 1_700_000_000);
    }
}
