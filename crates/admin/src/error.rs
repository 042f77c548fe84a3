//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lotus_core::{CommerceError, StoreError};
use thiserror::Error;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lookup or edit failed in the engine.
    #[error("{0}")]
    Commerce(#[from] CommerceError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Commerce(err) => match err {
                CommerceError::InvalidArgument(_) | CommerceError::SignatureInvalid => {
                    StatusCode::BAD_REQUEST
                }
                CommerceError::NotFound { .. } => StatusCode::NOT_FOUND,
                CommerceError::IllegalTransition { .. }
                | CommerceError::OutOfStock { .. }
                | CommerceError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
                CommerceError::AmountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CommerceError::InventoryAdjustmentFailed { .. } | CommerceError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
