//! Cart Service
//!
//! Carts live server-side, keyed by the customer ID from the request
//! headers. Items must exist on the menu before they can be added.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::error::AppError;
use crate::menu::MenuItemRepository;

use super::repository::{CartRepository, PricedCartLine};

/// A customer's cart with totals, priced from the current menu
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartViewLine>,
    pub item_count: i64,
    pub total: Decimal,
}

/// One priced line of a cart view
#[derive(Debug, Clone, Serialize)]
pub struct CartViewLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<PricedCartLine> for CartViewLine {
    fn from(line: PricedCartLine) -> Self {
        Self {
            menu_item_id: line.menu_item_id,
            name: line.name,
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total,
        }
    }
}

/// Service for cart management
#[derive(Debug, Clone)]
pub struct CartService {
    repo: CartRepository,
    menu: MenuItemRepository,
}

impl CartService {
    /// Create a new CartService with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: CartRepository::new(pool.clone()),
            menu: MenuItemRepository::new(pool),
        }
    }

    /// Add an item to the customer's cart.
    ///
    /// # Errors
    /// - `DomainError::InvalidQuantity` if quantity < 1
    /// - `DomainError::MenuItemNotFound` if the item is not on the menu
    pub async fn add_item(
        &self,
        user_id: Uuid,
        menu_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), AppError> {
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity).into());
        }

        if self.menu.find_by_id(menu_item_id).await?.is_none() {
            return Err(DomainError::MenuItemNotFound(menu_item_id.to_string()).into());
        }

        self.repo.upsert_item(user_id, menu_item_id, quantity).await?;

        tracing::debug!(
            "Added {} x {} to cart of user {}",
            quantity,
            menu_item_id,
            user_id
        );

        Ok(())
    }

    /// The customer's cart, priced from the current menu.
    pub async fn view(&self, user_id: Uuid) -> Result<CartView, AppError> {
        let lines = self.repo.priced_lines(user_id).await?;

        let total = lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.line_total);
        let item_count = lines.iter().map(|line| i64::from(line.quantity)).sum();

        Ok(CartView {
            items: lines.into_iter().map(CartViewLine::from).collect(),
            item_count,
            total,
        })
    }

    /// Remove one line from the cart. Removing an absent line is a no-op.
    pub async fn remove_item(&self, user_id: Uuid, menu_item_id: Uuid) -> Result<(), AppError> {
        let removed = self.repo.remove_item(user_id, menu_item_id).await?;

        if removed {
            tracing::debug!("Removed {} from cart of user {}", menu_item_id, user_id);
        }

        Ok(())
    }

    /// Empty the customer's cart.
    pub async fn clear(&self, user_id: Uuid) -> Result<(), AppError> {
        let removed = self.repo.clear(user_id).await?;

        tracing::debug!("Cleared {} line(s) from cart of user {}", removed, user_id);

        Ok(())
    }
}
