//! Menu module
//!
//! Menu item catalogue with category and vegan filtering.

mod repository;
mod service;

pub use repository::{MenuFilter, MenuItem, MenuItemRepository, NewMenuItem};
pub use service::MenuService;
