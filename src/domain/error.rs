//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Business rule violations and domain invariant failures.
///
/// These errors are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid price (zero, negative, bad scale, or exceeds limit)
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be at least 1
    #[error("Invalid quantity: {0} (must be at least 1)")]
    InvalidQuantity(i32),

    /// Menu category not recognised
    #[error("Unknown menu category: {0}")]
    UnknownCategory(String),

    /// Order status not recognised
    #[error("Unknown order status: {0}")]
    UnknownOrderStatus(String),

    /// Checkout attempted with no items in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Menu item name already taken
    #[error("Menu item already exists: {0}")]
    DuplicateMenuItem(String),

    /// Menu item not found
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    /// Order not found
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Unauthorized operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl DomainError {
    /// Check if this is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrice(_)
                | Self::InvalidQuantity(_)
                | Self::UnknownCategory(_)
                | Self::UnknownOrderStatus(_)
                | Self::EmptyCart
                | Self::Unauthorized(_)
        )
    }

    /// Check if this is a uniqueness conflict
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::DuplicateMenuItem(_))
    }

    /// Check if this refers to a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MenuItemNotFound(_) | Self::OrderNotFound(_))
    }
}
