//! Cart Repository
//!
//! One row per (customer, menu item) pair. Quantities accumulate when
//! the same item is added again.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::price;

/// Cart line joined with the menu for display and checkout
#[derive(Debug, Clone)]
pub struct PricedCartLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Repository for cart_items
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new CartRepository with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add `quantity` of an item to a customer's cart. Existing lines
    /// accumulate instead of being replaced.
    pub async fn upsert_item(
        &self,
        user_id: Uuid,
        menu_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, menu_item_id, quantity, added_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, menu_item_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, added_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(menu_item_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All cart lines for a customer, priced from the current menu.
    pub async fn priced_lines(&self, user_id: Uuid) -> Result<Vec<PricedCartLine>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal, i32)>(
            r#"
            SELECT ci.menu_item_id, mi.name, mi.price, ci.quantity
            FROM cart_items ci
            JOIN menu_items mi ON mi.id = ci.menu_item_id
            WHERE ci.user_id = $1
            ORDER BY ci.added_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(menu_item_id, name, unit_price, quantity)| PricedCartLine {
            menu_item_id,
            name,
            unit_price,
            quantity,
            line_total: price::line_total(unit_price, quantity),
        })
        .collect();

        Ok(rows)
    }

    /// Remove one line from the cart. Returns false when no line matched.
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        menu_item_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM cart_items WHERE user_id = $1 AND menu_item_id = $2
            "#,
        )
        .bind(user_id)
        .bind(menu_item_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Empty the customer's cart. Returns the number of removed lines.
    pub async fn clear(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM cart_items WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
