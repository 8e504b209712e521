//! Order Repository
//!
//! Orders and their line snapshots. Checkout is a single transaction
//! that turns cart lines into an order, so later menu edits never
//! change what a customer already paid.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{price, OrderStatus};

/// Stored order
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_cost: Decimal,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored order line with menu data snapshotted at checkout
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Result of an order status update
#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub previous: OrderStatus,
    pub current: OrderStatus,
}

type OrderRow = (Uuid, Uuid, String, Decimal, Option<String>, DateTime<Utc>);

fn map_status(status: &str) -> Result<OrderStatus, sqlx::Error> {
    status
        .parse::<OrderStatus>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: Box::new(e),
        })
}

fn map_order(row: OrderRow) -> Result<Order, sqlx::Error> {
    let (id, user_id, status, total_cost, comment, created_at) = row;

    Ok(Order {
        id,
        user_id,
        status: map_status(&status)?,
        total_cost,
        comment,
        created_at,
    })
}

/// Repository for orders and order_items
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new OrderRepository with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Turn the customer's cart into an order.
    ///
    /// Reads the cart, snapshots name and price per line, inserts the
    /// order with its items and clears the cart, all in one
    /// transaction. The cart lines are locked for the duration, so a
    /// concurrent checkout of the same cart sees it already emptied.
    ///
    /// Returns `None` (and leaves nothing behind) when the cart is
    /// empty.
    pub async fn place_from_cart(
        &self,
        user_id: Uuid,
        comment: Option<&str>,
    ) -> Result<Option<Order>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let lines = sqlx::query_as::<_, (Uuid, String, Decimal, i32)>(
            r#"
            SELECT ci.menu_item_id, mi.name, mi.price, ci.quantity
            FROM cart_items ci
            JOIN menu_items mi ON mi.id = ci.menu_item_id
            WHERE ci.user_id = $1
            ORDER BY ci.added_at
            FOR UPDATE OF ci
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Ok(None);
        }

        let total_cost = lines
            .iter()
            .fold(Decimal::ZERO, |acc, (_, _, unit_price, quantity)| {
                acc + price::line_total(*unit_price, *quantity)
            });

        let order_id = Uuid::new_v4();
        let status = OrderStatus::Received;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (id, user_id, status, total_cost, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING created_at
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(status.as_str())
        .bind(total_cost)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        for (menu_item_id, name, unit_price, quantity) in &lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, menu_item_id, item_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(menu_item_id)
            .bind(name)
            .bind(unit_price)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            DELETE FROM cart_items WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(Order {
            id: order_id,
            user_id,
            status,
            total_cost,
            comment: comment.map(str::to_string),
            created_at,
        }))
    }

    /// Find an order by ID.
    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, status, total_cost, comment, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_order).transpose()
    }

    /// Line items of an order, ordered by item name.
    pub async fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal, i32)>(
            r#"
            SELECT menu_item_id, item_name, unit_price, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY item_name
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(menu_item_id, name, unit_price, quantity)| OrderItem {
            menu_item_id,
            name,
            unit_price,
            quantity,
        })
        .collect();

        Ok(rows)
    }

    /// A customer's orders, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, status, total_cost, comment, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_order).collect()
    }

    /// All orders, newest first (admin view).
    pub async fn list_all(&self, limit: i64) -> Result<Vec<Order>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, status, total_cost, comment, created_at
            FROM orders
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_order).collect()
    }

    /// Set an order's status, returning the previous and new states.
    /// Returns `None` when the order does not exist.
    pub async fn set_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<StatusChange>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<String> = sqlx::query_scalar(
            r#"
            SELECT status FROM orders WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE orders SET status = $2 WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(StatusChange {
            order_id,
            previous: map_status(&previous)?,
            current: status,
        }))
    }

    /// Order count and revenue for orders created at or after `cutoff`.
    /// Both are zero when nothing was ordered in the window.
    pub async fn stats_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<(i64, Decimal), sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cost), 0)
            FROM orders
            WHERE created_at >= $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
    }

    /// Every order's (customer, creation time) pair, sorted for the
    /// inter-order gap scan.
    pub async fn list_order_times(&self) -> Result<Vec<(Uuid, DateTime<Utc>)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT user_id, created_at
            FROM orders
            ORDER BY user_id, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
