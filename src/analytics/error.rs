//! Analytics Errors
//!
//! Error types for aggregation and tracking operations.

/// Errors that can occur while building reports or recording events
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The backing store could not be read or written
    #[error("Analytics store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// Input rejected before the store was touched
    #[error("Invalid tracking input: {0}")]
    InvalidInput(String),
}

impl AnalyticsError {
    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalyticsError::InvalidInput(_))
    }
}
