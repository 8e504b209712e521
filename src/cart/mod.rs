//! Cart module
//!
//! Server-side carts, one per customer.

mod repository;
mod service;

pub use repository::{CartRepository, PricedCartLine};
pub use service::{CartService, CartView, CartViewLine};
