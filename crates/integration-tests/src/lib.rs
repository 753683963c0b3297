//! Integration tests for Soko.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no database needed)
//! cargo test -p soko-integration-tests
//!
//! # Database-backed tests
//! SOKO_TEST_DATABASE_URL=postgres://localhost/soko_test \
//!     cargo test -p soko-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `router` - HTTP surface served in-process with `tower::ServiceExt::oneshot`
//! - `payment_settlement` - payment flow against an in-memory ledger
//! - `change_feed` - Server-Sent Events fan-out
//! - `ledger` - `PostgreSQL` payment ledger (ignored without a database)

use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::Response;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use url::Url;

use soko_api::config::{ApiConfig, LogFormat, MpesaConfig, MpesaEnvironment};
use soko_api::realtime::EventHub;
use soko_api::state::AppState;

/// Callback token used by [`with_mpesa`].
pub const CALLBACK_TOKEN: &str = "cb-4f9a2c7e1d";

/// A configuration with every optional integration disabled.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://soko@127.0.0.1:1/soko_test"),
        host: [127, 0, 0, 1].into(),
        port: 8080,
        public_url: Url::parse("http://localhost:8080").expect("valid url"),
        mpesa: None,
        assistant: None,
        vapid_public_key: None,
        shell: None,
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Enable M-Pesa with a callback token. The gateway itself is never reached.
#[must_use]
pub fn with_mpesa(mut config: ApiConfig) -> ApiConfig {
    config.mpesa = Some(MpesaConfig {
        environment: MpesaEnvironment::Sandbox,
        base_url: "http://127.0.0.1:1".to_string(),
        consumer_key: SecretString::from("test-consumer-key"),
        consumer_secret: SecretString::from("test-consumer-secret"),
        shortcode: "174379".to_string(),
        passkey: SecretString::from("test-passkey"),
        callback_url: Url::parse("http://localhost:8080/api/mpesa/callback")
            .expect("valid url"),
        callback_token: Some(SecretString::from(CALLBACK_TOKEN)),
        timeout: Duration::from_secs(1),
    });
    config
}

/// A pool that never connects until used; queries fail fast.
#[must_use]
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://soko@127.0.0.1:1/soko_test")
        .expect("valid database url")
}

/// Build the router and its event hub for `config`.
#[must_use]
pub fn test_app(config: ApiConfig) -> (Router, EventHub) {
    let events = EventHub::new();
    let state = AppState::new(config, unreachable_pool(), events.clone())
        .expect("Failed to build application state");
    (soko_api::app(state), events)
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body cannot be read or is not JSON.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Connect to the database named by `SOKO_TEST_DATABASE_URL` and migrate it.
///
/// # Panics
///
/// Panics if the variable is unset or the database is unreachable.
pub async fn test_database() -> PgPool {
    let url = std::env::var("SOKO_TEST_DATABASE_URL")
        .expect("SOKO_TEST_DATABASE_URL must be set for database tests");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
