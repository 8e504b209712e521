//! Orders module
//!
//! Checkout, order history and status management.

mod repository;
mod service;

pub use repository::{Order, OrderItem, OrderRepository, StatusChange};
pub use service::OrderService;
