//! Error types for the assistant client.

use thiserror::Error;

/// Errors that can occur when asking the assistant.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned an error.
    #[error("API error ({error_type}): {message}")]
    Api {
        /// Error type from the provider.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the provider.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The API key was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The completion had no choices or no text.
    #[error("assistant returned no reply")]
    EmptyResponse,

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Error body of `OpenAI`-compatible APIs: `{"error":{"type":..,"message":..}}`.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// Error type, when the provider sends one.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error message.
    pub message: String,
}
