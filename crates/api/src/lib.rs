//! Soko marketplace backend library.
//!
//! The binary in `main.rs` is a thin shell around [`app`]; everything it
//! serves lives here so the router can be exercised end to end in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assistant;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod mpesa;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod shell;
pub mod state;

use std::time::Duration;

use axum::Router;
use axum::http::{
    HeaderName, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{REQUEST_ID_HEADER, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// Sentry layers are added by the binary so tests don't need a Sentry hub.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    routes::routes()
        .layer(axum::middleware::from_fn(security_headers_middleware))
        // Inside the trace layer so the ID is recorded on its span
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}
