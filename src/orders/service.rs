//! Order Service
//!
//! Checkout and order lifecycle management.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DomainError, OrderStatus};
use crate::error::AppError;

use super::repository::{Order, OrderItem, OrderRepository, StatusChange};

/// Service for placing and managing orders
#[derive(Debug, Clone)]
pub struct OrderService {
    repo: OrderRepository,
}

impl OrderService {
    /// Create a new OrderService with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: OrderRepository::new(pool),
        }
    }

    /// Place an order from everything currently in the customer's cart.
    ///
    /// # Errors
    /// - `DomainError::EmptyCart` if there is nothing to order
    pub async fn checkout(
        &self,
        user_id: Uuid,
        comment: Option<&str>,
    ) -> Result<Order, AppError> {
        let order = self
            .repo
            .place_from_cart(user_id, comment)
            .await?
            .ok_or(DomainError::EmptyCart)?;

        tracing::info!(
            "Order {} placed by user {} (total {})",
            order.id,
            user_id,
            order.total_cost
        );

        Ok(order)
    }

    /// Fetch an order with its line items.
    ///
    /// # Errors
    /// - `DomainError::OrderNotFound` if the order does not exist
    pub async fn get(&self, order_id: Uuid) -> Result<(Order, Vec<OrderItem>), AppError> {
        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;

        let items = self.repo.items(order_id).await?;

        Ok((order, items))
    }

    /// A customer's order history, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_for_user(user_id).await?)
    }

    /// All orders, newest first (admin view).
    pub async fn list_all(&self, limit: i64) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_all(limit).await?)
    }

    /// Move an order to a new status.
    ///
    /// Any known status may be set directly so staff can correct
    /// mistakes without walking the whole lifecycle.
    ///
    /// # Errors
    /// - `DomainError::OrderNotFound` if the order does not exist
    pub async fn set_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<StatusChange, AppError> {
        let change = self
            .repo
            .set_status(order_id, status)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;

        tracing::info!(
            "Order {} status changed: {} -> {}",
            order_id,
            change.previous,
            change.current
        );

        Ok(change)
    }
}
