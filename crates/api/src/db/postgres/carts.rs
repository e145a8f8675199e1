//! Carts: one row per owner, items stored as a JSONB document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use bazaar_core::{CartId, UserId};

use super::PgStore;
use crate::db::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem};

#[derive(FromRow)]
struct CartRow {
    id: String,
    owner_id: String,
    items: Json<Vec<CartItem>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            owner: UserId::new(row.owner_id),
            items: row.items.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_or_create_cart(&self, owner: &UserId) -> Result<Cart, RepositoryError> {
        let fresh = Cart::new(owner.clone());

        // The unique owner_id makes concurrent creators converge on one row.
        sqlx::query(
            r"
            INSERT INTO bazaar.cart (id, owner_id, items, version, created_at, updated_at)
            VALUES ($1, $2, '[]'::jsonb, 0, $3, $3)
            ON CONFLICT (owner_id) DO NOTHING
            ",
        )
        .bind(fresh.id.as_str())
        .bind(owner.as_str())
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await?;

        let row: CartRow = sqlx::query_as(
            r"
            SELECT id, owner_id, items, version, created_at, updated_at
            FROM bazaar.cart
            WHERE owner_id = $1
            ",
        )
        .bind(owner.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Cart::from(row))
    }

    async fn replace_cart_items(
        &self,
        id: &CartId,
        expected_version: i64,
        items: &[CartItem],
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.cart
            SET items = $3, version = version + 1, updated_at = $4
            WHERE id = $1 AND version = $2
            ",
        )
        .bind(id.as_str())
        .bind(expected_version)
        .bind(Json(items))
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_cart(
        &self,
        owner: &UserId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let fresh = Cart::new(owner.clone());

        sqlx::query(
            r"
            INSERT INTO bazaar.cart (id, owner_id, items, version, created_at, updated_at)
            VALUES ($1, $2, '[]'::jsonb, 0, $3, $3)
            ON CONFLICT (owner_id) DO UPDATE
            SET items = '[]'::jsonb, version = bazaar.cart.version + 1, updated_at = $3
            ",
        )
        .bind(fresh.id.as_str())
        .bind(owner.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
