//! Safaricom Daraja (M-Pesa) client for Lipa na M-Pesa Online.
//!
//! # Flow
//!
//! 1. Exchange the consumer key/secret for an OAuth bearer token (cached
//!    until shortly before it expires)
//! 2. Send an STK push: the customer's phone shows a PIN prompt
//! 3. Daraja POSTs the outcome to our callback URL some seconds later
//!
//! The push response only means the prompt was delivered. Whether money
//! moved is known from the callback alone.

pub mod auth;
pub mod client;
pub mod types;

pub use client::{MpesaClient, PaymentGateway, StkPush};
pub use types::{CallbackMetadata, StkCallback, StkCallbackEnvelope, StkPushResponse};

use thiserror::Error;

/// Errors that can occur when talking to Daraja.
#[derive(Debug, Error)]
pub enum MpesaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The consumer key/secret were rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Daraja answered with an error body or a non-zero response code.
    #[error("gateway error ({code}): {message}")]
    Api {
        /// `errorCode` or `ResponseCode` from the gateway.
        code: String,
        /// Human-readable message from the gateway.
        message: String,
    },

    /// Rate limited by the gateway.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
