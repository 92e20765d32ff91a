//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Limiters per endpoint category:
//! - `auth_rate_limiter`: register and login (~10/min)
//! - `vault_rate_limiter`: password-gated payment vault mutations (~20/min)
//! - `api_rate_limiter`: cart, order and address endpoints (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Headers checked for the real client IP, most trusted first.
const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor that reads the client IP from proxy headers, then
/// `X-Forwarded-For`, then the TCP peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        if let Some(ip) = CLIENT_IP_HEADERS.iter().find_map(|name| header_ip(name)) {
            return Ok(ip);
        }

        // First IP in the chain
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer = GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_seconds: u64, burst: u32) -> Option<RateLimiterLayer> {
    GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_seconds)
        .burst_size(burst)
        .finish()
        .map(|config| GovernorLayer::new(Arc::new(config)))
}

/// Rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// One token every 6 seconds, burst of 5.
///
/// # Panics
///
/// Never in practice: the period and burst are non-zero constants, which
/// `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(6, 5).expect("rate limiter config with per_second(6) and burst_size(5) is valid")
}

/// Rate limiter for payment vault mutations: ~20 requests per minute per IP.
///
/// One token every 3 seconds, burst of 5. Each of these requests carries a
/// password, so they are limited like logins.
///
/// # Panics
///
/// Never in practice: the period and burst are non-zero constants.
#[must_use]
pub fn vault_rate_limiter() -> RateLimiterLayer {
    limiter(3, 5).expect("rate limiter config with per_second(3) and burst_size(5) is valid")
}

/// Rate limiter for the general API: ~100 requests per minute per IP.
///
/// One token per second, burst of 50.
///
/// # Panics
///
/// Never in practice: the period and burst are non-zero constants.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(1, 50).expect("rate limiter config with per_second(1) and burst_size(50) is valid")
}
