//! Analytics module
//!
//! Conversion tracking and order aggregation for the admin dashboard.

mod error;
pub mod report;
mod service;
mod tracking;

pub use error::AnalyticsError;
pub use report::{AnalyticsReport, ConversionStats, LastMonthStats, OrderGap};
pub use service::AnalyticsService;
pub use tracking::{CartAddition, NewCartAddition, TrackingRepository};
