//! Orders, with item snapshots and shipping address stored as JSONB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use bazaar_core::{OrderCode, OrderId, OrderStatus, PaymentStatus, Price, UserId};

use super::{PgStore, conflict_on_unique, corrupt};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, OrderItem, ShippingAddress};

const ORDER_COLUMNS: &str = "id, code, owner_id, items, total, status, shipping_address, \
     payment_method, payment_status, payment_details, created_at, updated_at";

#[derive(FromRow)]
struct OrderRow {
    id: String,
    code: String,
    owner_id: String,
    items: Json<Vec<OrderItem>>,
    total: Price,
    status: String,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_status: String,
    payment_details: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| corrupt("order status", e))?;
        let payment_status: PaymentStatus = row
            .payment_status
            .parse()
            .map_err(|e| corrupt("payment status", e))?;

        Ok(Self {
            id: OrderId::new(row.id),
            code: OrderCode::new(row.code),
            owner: UserId::new(row.owner_id),
            items: row.items.0,
            total: row.total,
            status,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            payment_status,
            payment_details: row.payment_details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.customer_order
                (id, code, owner_id, items, total, status, shipping_address,
                 payment_method, payment_status, payment_details, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(order.id.as_str())
        .bind(order.code.as_str())
        .bind(order.owner.as_str())
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(Json(&order.shipping_address))
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .bind(&order.payment_details)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "order"))?;
        Ok(())
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.customer_order
            SET status = $2, payment_status = $3, updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(payment_status.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_orders(&self, owner: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.customer_order \
             WHERE owner_id = $1 ORDER BY created_at DESC, id COLLATE \"C\" DESC"
        ))
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_order(
        &self,
        owner: &UserId,
        id: &OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.customer_order WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id.as_str())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}
