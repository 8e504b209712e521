//! Analytics Service
//!
//! Read-side aggregation over orders and the cart addition log. All
//! heavy lifting is delegated to the pure functions in `report`; this
//! service only fetches rows and assembles the result.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::orders::OrderRepository;

use super::report::{
    self, AnalyticsReport, ConversionStats, LastMonthStats, OrderGap, LAST_MONTH_WINDOW_DAYS,
};
use super::tracking::{NewCartAddition, TrackingRepository};
use super::AnalyticsError;

/// Service for the analytics dashboard and tracking ingestion
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    orders: OrderRepository,
    tracking: TrackingRepository,
}

impl AnalyticsService {
    /// Create a new AnalyticsService with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool.clone()),
            tracking: TrackingRepository::new(pool),
        }
    }

    /// Record one cart addition event.
    ///
    /// # Errors
    /// - `AnalyticsError::InvalidInput` if the event fails validation,
    ///   before the store is touched
    /// - `AnalyticsError::Unavailable` if the write fails
    pub async fn record_cart_addition(
        &self,
        event: NewCartAddition,
    ) -> Result<Uuid, AnalyticsError> {
        event.validate()?;

        let id = self.tracking.append(&event).await?;

        tracing::debug!(
            "Cart addition {} recorded for menu item {}",
            id,
            event.menu_item_id
        );

        Ok(id)
    }

    /// Conversion between cart additions and purchased order lines.
    pub async fn conversion_stats(&self) -> Result<ConversionStats, AnalyticsError> {
        let total_cart_additions = self.tracking.count_cart_additions().await?;
        let total_purchases = self.tracking.count_purchases().await?;

        Ok(ConversionStats {
            total_cart_additions,
            total_purchases,
            conversion_rate_pct: report::conversion_rate(total_purchases, total_cart_additions),
        })
    }

    /// Order count and revenue over the trailing last-month window.
    pub async fn last_month_stats(&self) -> Result<LastMonthStats, AnalyticsError> {
        let cutoff = Utc::now() - Duration::days(LAST_MONTH_WINDOW_DAYS);
        let (order_count, revenue) = self.orders.stats_since(cutoff).await?;

        Ok(LastMonthStats {
            order_count,
            revenue,
        })
    }

    /// Average time between consecutive orders of the same customer.
    pub async fn average_order_gap(&self) -> Result<OrderGap, AnalyticsError> {
        let order_times = self.orders.list_order_times().await?;

        Ok(match report::average_order_gap_secs(order_times) {
            Some(seconds) => OrderGap {
                seconds,
                formatted: report::format_order_gap(seconds),
            },
            None => OrderGap {
                seconds: 0,
                formatted: report::NO_DATA.to_string(),
            },
        })
    }

    /// Full dashboard report.
    pub async fn report(&self) -> Result<AnalyticsReport, AnalyticsError> {
        let conversion = self.conversion_stats().await?;
        let last_month = self.last_month_stats().await?;
        let gap = self.average_order_gap().await?;

        Ok(AnalyticsReport {
            conversion_rate_pct: conversion.conversion_rate_pct,
            total_cart_additions: conversion.total_cart_additions,
            total_purchases: conversion.total_purchases,
            last_month_order_count: last_month.order_count,
            last_month_revenue: last_month.revenue,
            avg_order_gap_secs: gap.seconds,
            avg_order_gap_formatted: gap.formatted,
        })
    }
}
