//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::assistant::AssistantError;
use crate::db::RepositoryError;
use crate::services::PaymentError;
use crate::shell::ShellError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payment initiation or settlement failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Assistant provider call failed.
    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    /// App shell asset could not be fetched.
    #[error("Shell error: {0}")]
    Shell(#[from] ShellError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller failed authentication.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An optional integration is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) | Self::Payment(PaymentError::Ledger(e)) => repository_status(e),
            Self::Payment(PaymentError::InvalidPhone(_) | PaymentError::InvalidAmount)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Payment(PaymentError::UnknownOrder(_)) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Payment(PaymentError::Gateway(crate::mpesa::MpesaError::RateLimited(_)))
            | Self::Assistant(AssistantError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Payment(PaymentError::Gateway(_)) | Self::Assistant(_) | Self::Shell(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound)
            | Self::Payment(PaymentError::Ledger(RepositoryError::NotFound)) => {
                "Not found".to_string()
            }
            Self::Database(RepositoryError::Conflict(msg))
            | Self::Payment(PaymentError::Ledger(RepositoryError::Conflict(msg))) => msg.clone(),
            Self::Database(_) | Self::Payment(PaymentError::Ledger(_)) => {
                "Internal server error".to_string()
            }
            Self::Payment(PaymentError::Gateway(_)) => "Payment service error".to_string(),
            Self::Assistant(AssistantError::RateLimited(_)) => {
                "Assistant is busy, try again shortly".to_string()
            }
            Self::Assistant(_) => "Assistant service error".to_string(),
            Self::Shell(_) => "Upstream asset error".to_string(),
            Self::Payment(e) => e.to_string(),
            _ => self.to_string(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server-side errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        } else {
            tracing::debug!(error = %self, %status, "API request rejected");
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
