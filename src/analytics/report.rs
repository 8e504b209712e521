//! Report math
//!
//! Pure aggregation functions behind the analytics service. Everything in
//! this module is synchronous and store-free so the arithmetic can be
//! tested without a database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Window used for the "last month" order statistics, in days.
pub const LAST_MONTH_WINDOW_DAYS: i64 = 30;

/// Formatted gap shown when no customer has ordered twice yet.
pub const NO_DATA: &str = "no data";

/// Aggregated analytics over the whole order history.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    /// Purchased line items per cart addition, as a percentage
    pub conversion_rate_pct: f64,
    pub total_cart_additions: i64,
    pub total_purchases: i64,
    /// Orders placed within the last-month window
    pub last_month_order_count: i64,
    /// Revenue from orders within the last-month window
    pub last_month_revenue: Decimal,
    /// Average seconds between consecutive orders of the same customer
    pub avg_order_gap_secs: i64,
    /// Human readable form of `avg_order_gap_secs`
    pub avg_order_gap_formatted: String,
}

/// Order count and revenue over a trailing window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LastMonthStats {
    pub order_count: i64,
    pub revenue: Decimal,
}

/// Cart addition and purchase totals with the derived rate.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConversionStats {
    pub total_cart_additions: i64,
    pub total_purchases: i64,
    pub conversion_rate_pct: f64,
}

/// Average inter-order gap in raw and human readable form.
#[derive(Debug, Clone, Serialize)]
pub struct OrderGap {
    pub seconds: i64,
    pub formatted: String,
}

/// Percentage of cart additions that became purchased line items.
///
/// Returns 0.0 when nothing was added to a cart yet, so a fresh
/// deployment reports a zero rate instead of dividing by zero.
pub fn conversion_rate(total_purchases: i64, total_cart_additions: i64) -> f64 {
    if total_cart_additions == 0 {
        return 0.0;
    }
    total_purchases as f64 / total_cart_additions as f64 * 100.0
}

/// Average seconds between consecutive orders of the same customer.
///
/// Orders are grouped per customer by sorting on (customer, time) and
/// scanning once. Gaps of zero seconds (duplicate timestamps) are
/// discarded. Returns `None` when no customer has two orders with a
/// positive gap between them.
pub fn average_order_gap_secs(mut orders: Vec<(Uuid, DateTime<Utc>)>) -> Option<i64> {
    orders.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut gap_sum: i64 = 0;
    let mut gap_count: i64 = 0;
    let mut prev: Option<&(Uuid, DateTime<Utc>)> = None;

    for row in &orders {
        if let Some((prev_user, prev_time)) = prev {
            if *prev_user == row.0 {
                let gap = (row.1 - *prev_time).num_seconds();
                if gap > 0 {
                    gap_sum += gap;
                    gap_count += 1;
                }
            }
        }
        prev = Some(row);
    }

    if gap_count == 0 {
        None
    } else {
        // Integer division floors, matching the truncated mean we report
        Some(gap_sum / gap_count)
    }
}

/// Render a gap in seconds for the dashboard.
///
/// Only the two most significant units are shown and every unit is
/// truncated, never rounded:
/// - under a minute: `"45 sec."`
/// - under an hour: `"5 min. 3 sec."`
/// - under a day: `"7 hr. 16 min."`
/// - a day or more: `"2 day(s)."` or `"2 day(s). 5 hr."` when hours remain
pub fn format_order_gap(total_seconds: i64) -> String {
    let secs = total_seconds.max(0);

    if secs < 60 {
        return format!("{} sec.", secs);
    }
    if secs < 3_600 {
        return format!("{} min. {} sec.", secs / 60, secs % 60);
    }
    if secs < 86_400 {
        return format!("{} hr. {} min.", secs / 3_600, (secs % 3_600) / 60);
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    if hours == 0 {
        format!("{} day(s).", days)
    } else {
        format!("{} day(s). {} hr.", days, hours)
    }
}
