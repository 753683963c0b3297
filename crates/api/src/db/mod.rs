//! Database operations for the marketplace `PostgreSQL`.
//!
//! ## Tables touched by this service
//!
//! - `orders` - status and payment fields
//! - `rides` - status and driver assignment
//! - `drivers` - online flag and last known position
//! - `payment_requests` - STK pushes awaiting their callback
//! - `transactions` - ledger entries written on settlement
//! - `push_subscriptions` - browser push endpoints
//! - `chats`, `notifications` - messages and inbox entries
//!
//! The remaining tables (`users`, `sellers`, `products`, ...) are written by
//! other clients; they exist here only so the schema is complete.
//!
//! Queries are checked at runtime (`sqlx::query_as`) rather than with the
//! compile-time macros, so the crate builds without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p soko-cli -- migrate
//! ```

pub mod chats;
pub mod drivers;
pub mod orders;
pub mod payments;
pub mod push_subscriptions;
pub mod rides;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use chats::{ChatRepository, NotificationRepository};
pub use drivers::DriverRepository;
pub use orders::OrderRepository;
pub use payments::PgPaymentLedger;
pub use push_subscriptions::PushSubscriptionRepository;
pub use rides::RideRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost race (e.g., status changed underneath us).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
