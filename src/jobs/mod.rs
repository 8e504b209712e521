//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.
//! These jobs are run on a schedule to clean up expired data and maintain system health.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

/// Cart lines untouched for this long are considered abandoned
pub const STALE_CART_DAYS: i64 = 30;

// =========================================================================
// Tracking Event Retention Job
// =========================================================================

/// Delete cart addition tracking events older than the retention window.
/// The conversion metric is meant to reflect recent behaviour, and the
/// append-only log would otherwise grow without bound.
pub async fn prune_tracking_events(
    pool: &PgPool,
    retention_days: i64,
) -> Result<u64, JobError> {
    let cutoff = Utc::now() - ChronoDuration::days(retention_days);

    let result = sqlx::query(
        r#"
        DELETE FROM cart_additions
        WHERE added_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            retention_days = retention_days,
            "Pruned aged cart addition events"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Abandoned Cart Cleanup Job
// =========================================================================

/// Delete cart lines that have not been touched for 30 days.
/// Adding the same item again refreshes `added_at`, so only genuinely
/// abandoned carts are removed.
pub async fn prune_stale_cart_items(pool: &PgPool) -> Result<u64, JobError> {
    let cutoff = Utc::now() - ChronoDuration::days(STALE_CART_DAYS);

    let result = sqlx::query(
        r#"
        DELETE FROM cart_items
        WHERE added_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            "Cleaned up abandoned cart lines"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for tracking event pruning (default: 1 hour)
    pub tracking_prune_interval: Duration,
    /// Interval for abandoned cart cleanup (default: 1 hour)
    pub cart_prune_interval: Duration,
    /// How long tracking events are kept, in days (default: 180)
    pub tracking_retention_days: i64,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            tracking_prune_interval: Duration::from_secs(3600),
            cart_prune_interval: Duration::from_secs(3600),
            tracking_retention_days: 180,
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut tracking_interval = interval(self.config.tracking_prune_interval);
        let mut cart_interval = interval(self.config.cart_prune_interval);

        loop {
            tokio::select! {
                _ = tracking_interval.tick() => {
                    if let Err(e) = prune_tracking_events(
                        &self.pool,
                        self.config.tracking_retention_days,
                    ).await {
                        tracing::error!(error = %e, "Tracking event pruning failed");
                    }
                }
                _ = cart_interval.tick() => {
                    if let Err(e) = prune_stale_cart_items(&self.pool).await {
                        tracing::error!(error = %e, "Abandoned cart cleanup failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match prune_tracking_events(&self.pool, self.config.tracking_retention_days).await {
            Ok(count) => report.tracking_events_pruned = count,
            Err(e) => report.errors.push(format!("Tracking event pruning: {}", e)),
        }

        match prune_stale_cart_items(&self.pool).await {
            Ok(count) => report.cart_items_pruned = count,
            Err(e) => report.errors.push(format!("Abandoned cart cleanup: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub tracking_events_pruned: u64,
    pub cart_items_pruned: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_scheduler_config_default() {
        let config = JobSchedulerConfig::default();
        assert_eq!(config.tracking_prune_interval, Duration::from_secs(3600));
        assert_eq!(config.cart_prune_interval, Duration::from_secs(3600));
        assert_eq!(config.tracking_retention_days, 180);
    }

    #[test]
    fn test_stale_cart_window() {
        assert_eq!(STALE_CART_DAYS, 30);
    }

    #[test]
    fn test_maintenance_report_default() {
        let report = MaintenanceReport::default();
        assert_eq!(report.tracking_events_pruned, 0);
        assert_eq!(report.cart_items_pruned, 0);
        assert_eq!(report.errors.len(), 0);
    }
}
