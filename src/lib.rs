//! tavola Library
//!
//! Re-exports modules for integration testing and external use.

pub mod analytics;
pub mod api;
pub mod audit;
pub mod cart;
pub mod domain;
pub mod jobs;
pub mod menu;
pub mod orders;

// Private modules (used only by main.rs binary)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{DomainError, MenuItemCategory, OrderStatus, Price, PriceError, RequestContext};
