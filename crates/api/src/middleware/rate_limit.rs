//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `assistant_rate_limiter`: each question costs an upstream LLM call (~6/min)
//! - `payment_rate_limiter`: each initiation pushes a PIN prompt to a phone (~12/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers carrying the real client IP, in order of trust.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor that prefers proxy headers and falls back to the peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        for name in CLIENT_IP_HEADERS {
            if let Some(ip) = headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
            {
                return Ok(ip);
            }
        }

        // First hop of X-Forwarded-For
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // Direct connection (no proxy)
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_secs: u64, burst: u32) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

/// Rate limiter for the assistant relay: one question every 10 seconds, burst of 5.
///
/// # Panics
///
/// Never in practice: the period and burst are non-zero constants, the only
/// inputs `GovernorConfigBuilder::finish` rejects.
#[must_use]
pub fn assistant_rate_limiter() -> RateLimiterLayer {
    limiter(10, 5).expect("non-zero assistant rate limit")
}

/// Rate limiter for STK push initiation: one push every 5 seconds, burst of 3.
///
/// # Panics
///
/// Never in practice: the period and burst are non-zero constants.
#[must_use]
pub fn payment_rate_limiter() -> RateLimiterLayer {
    limiter(5, 3).expect("non-zero payment rate limit")
}

#[cfg(test)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/api/assistant/chat")
    }

    #[test]
    fn test_prefers_cloudflare_header() {
        let req = request()
            .header("cf-connecting-ip", "197.248.10.1")
            .header("x-forwarded-for", "10.0.0.1")
            .body(())
            .expect("request");
        let ip = ClientIpKeyExtractor.extract(&req).expect("ip");
        assert_eq!(ip, "197.248.10.1".parse::<IpAddr>().expect("ip"));
    }

    #[test]
    fn test_uses_first_forwarded_hop() {
        let req = request()
            .header("x-forwarded-for", "41.90.1.2, 10.0.0.1")
            .body(())
            .expect("request");
        let ip = ClientIpKeyExtractor.extract(&req).expect("ip");
        assert_eq!(ip, "41.90.1.2".parse::<IpAddr>().expect("ip"));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = request().body(()).expect("request");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));
        let ip = ClientIpKeyExtractor.extract(&req).expect("ip");
        assert_eq!(ip, IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = request().body(()).expect("request");
        assert!(ClientIpKeyExtractor.extract(&req).is_err());
    }

    #[test]
    fn test_limiters_build() {
        let _ = assistant_rate_limiter();
        let _ = payment_rate_limiter();
    }
}
