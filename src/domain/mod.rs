//! Domain module
//!
//! Core domain types and business logic.

pub mod category;
pub mod context;
pub mod error;
pub mod price;

pub use category::{MenuItemCategory, OrderStatus};
pub use context::RequestContext;
pub use error::DomainError;
pub use price::{Price, PriceError};
