//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Analytics errors
    #[error(transparent)]
    Analytics(#[from] crate::analytics::AnalyticsError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::InvalidApiKey => {
                (StatusCode::UNAUTHORIZED, "invalid_api_key", None)
            }

            // 403 Forbidden
            AppError::PermissionDenied => {
                (StatusCode::FORBIDDEN, "permission_denied", None)
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone()))
            }

            // 400 Missing Header
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(ref domain_err) => {
                use crate::domain::DomainError;
                match domain_err {
                    DomainError::InvalidPrice(msg) => {
                        (StatusCode::BAD_REQUEST, "invalid_price", Some(msg.clone()))
                    }
                    DomainError::InvalidQuantity(q) => {
                        (StatusCode::BAD_REQUEST, "invalid_quantity", Some(q.to_string()))
                    }
                    DomainError::UnknownCategory(name) => {
                        (StatusCode::BAD_REQUEST, "unknown_category", Some(name.clone()))
                    }
                    DomainError::UnknownOrderStatus(name) => {
                        (StatusCode::BAD_REQUEST, "unknown_order_status", Some(name.clone()))
                    }
                    DomainError::EmptyCart => {
                        (StatusCode::BAD_REQUEST, "empty_cart", None)
                    }
                    DomainError::DuplicateMenuItem(name) => {
                        (StatusCode::CONFLICT, "duplicate_menu_item", Some(name.clone()))
                    }
                    DomainError::MenuItemNotFound(id) => {
                        (StatusCode::NOT_FOUND, "menu_item_not_found", Some(id.clone()))
                    }
                    DomainError::OrderNotFound(id) => {
                        (StatusCode::NOT_FOUND, "order_not_found", Some(id.clone()))
                    }
                    DomainError::Unauthorized(msg) => {
                        (StatusCode::FORBIDDEN, "unauthorized", Some(msg.clone()))
                    }
                }
            }

            // Analytics errors - bad input is the caller's fault, a
            // failed store read surfaces as unavailable
            AppError::Analytics(ref analytics_err) => {
                use crate::analytics::AnalyticsError;
                match analytics_err {
                    AnalyticsError::InvalidInput(msg) => {
                        (StatusCode::BAD_REQUEST, "invalid_tracking_input", Some(msg.clone()))
                    }
                    AnalyticsError::Unavailable(e) => {
                        tracing::error!("Analytics store unavailable: {:?}", e);
                        (StatusCode::SERVICE_UNAVAILABLE, "analytics_unavailable", None)
                    }
                }
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
