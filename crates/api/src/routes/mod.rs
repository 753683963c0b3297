//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                              - Liveness
//! GET   /health/ready                        - Readiness (database reachable)
//!
//! # Payments
//! GET   /api/mpesa?phone=&amount=&order_id=  - Send an STK push
//! POST  /api/mpesa/callback[?token=]         - Daraja result callback
//!
//! # Assistant
//! POST  /api/assistant/chat                  - Ask the shopping assistant
//!
//! # Change feed
//! GET   /api/events?feeds=orders,rides       - Server-Sent Events
//!
//! # Pricing and phone helpers
//! GET   /api/pricing/fare-preview            - base_fare + distance_km * per_km
//! GET   /api/pricing/errand                  - base_price scaled by urgency
//! GET   /api/phone/normalize?phone=          - Normalize a Kenyan number
//!
//! # Data
//! PATCH /api/orders/{id}/status              - Move an order along its lifecycle
//! PATCH /api/rides/{id}/status               - Move a ride along its lifecycle
//! PUT   /api/drivers/{id}/location           - Report a driver position
//! PUT   /api/drivers/{id}/online             - Toggle driver availability
//!
//! # Notifications
//! GET   /api/notifications/vapid-public-key  - Key for browser push subscribe
//! POST  /api/notifications/subscriptions     - Register a push endpoint
//!
//! # App shell
//! GET   /app/{*path}                         - Cache-first static assets
//! ```

pub mod assistant;
pub mod drivers;
pub mod events;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod phone;
pub mod pricing;
pub mod rides;
pub mod shell;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post, put},
};

use crate::middleware::{assistant_rate_limiter, payment_rate_limiter};
use crate::state::AppState;

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(payments::initiate).route_layer(payment_rate_limiter()),
        )
        .route("/callback", post(payments::callback))
}

/// Create the pricing and phone helper routes router.
pub fn helper_routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/fare-preview", get(pricing::fare_preview))
        .route("/pricing/errand", get(pricing::errand))
        .route("/phone/normalize", get(phone::normalize))
}

/// Create the data routes router.
pub fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/rides/{id}/status", patch(rides::update_status))
        .route("/drivers/{id}/location", put(drivers::update_location))
        .route("/drivers/{id}/online", put(drivers::set_online))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/vapid-public-key", get(notifications::vapid_public_key))
        .route("/subscriptions", post(notifications::subscribe))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/mpesa", payment_routes())
        .route(
            "/api/assistant/chat",
            post(assistant::chat).route_layer(assistant_rate_limiter()),
        )
        .route("/api/events", get(events::subscribe))
        .nest("/api", helper_routes())
        .nest("/api", data_routes())
        .nest("/api/notifications", notification_routes())
        .route("/app", get(shell::index))
        .route("/app/", get(shell::index))
        .route("/app/{*path}", get(shell::asset))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
