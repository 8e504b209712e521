//! Cart addition tracking
//!
//! Append-only log of cart additions. A row is written every time a
//! customer puts an item in their cart or opens an item's detail view,
//! and the conversion rate is computed against purchased order lines.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AnalyticsError;

/// Stored tracking event
#[derive(Debug, Clone)]
pub struct CartAddition {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Tracking event to be recorded
#[derive(Debug, Clone)]
pub struct NewCartAddition {
    pub menu_item_id: Uuid,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
}

impl NewCartAddition {
    /// Create an event for a menu item with no attribution.
    pub fn for_menu_item(menu_item_id: Uuid) -> Self {
        Self {
            menu_item_id,
            user_id: None,
            session_id: None,
            ip_address: None,
        }
    }

    /// Attribute the event to a signed-in customer.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attribute the event to an anonymous browser session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Record the client address the event came from.
    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Reject events that cannot be attributed to a real menu item.
    ///
    /// Runs before any store access so a bad request never reaches the
    /// database.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.menu_item_id.is_nil() {
            return Err(AnalyticsError::InvalidInput(
                "menu_item_id must be a non-nil UUID".to_string(),
            ));
        }
        Ok(())
    }
}

/// Repository for the cart_additions log
#[derive(Debug, Clone)]
pub struct TrackingRepository {
    pool: PgPool,
}

impl TrackingRepository {
    /// Create a new TrackingRepository with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one tracking event and return its ID.
    pub async fn append(&self, event: &NewCartAddition) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO cart_additions (id, menu_item_id, user_id, session_id, ip_address, added_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(id)
        .bind(event.menu_item_id)
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(&event.ip_address)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Total cart additions ever recorded.
    pub async fn count_cart_additions(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM cart_additions
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Total purchased order lines. One row per distinct item in an
    /// order, regardless of quantity.
    pub async fn count_purchases(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM order_items
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Most recent tracking events, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<CartAddition>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Option<String>, Option<String>, Option<String>, DateTime<Utc>)>(
            r#"
            SELECT id, menu_item_id, user_id, session_id, ip_address, added_at
            FROM cart_additions
            ORDER BY added_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(id, menu_item_id, user_id, session_id, ip_address, added_at)| CartAddition {
            id,
            menu_item_id,
            user_id,
            session_id,
            ip_address,
            added_at,
        })
        .collect();

        Ok(rows)
    }
}
