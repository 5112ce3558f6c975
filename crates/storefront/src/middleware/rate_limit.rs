//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Provides configurable rate limiters for different endpoint categories:
//! - `auth_rate_limiter`: Strict limits for sign-in and registration (~10/min)
//! - `chat_rate_limiter`: Limits for the AI coach, which costs a backend call (~20/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor keyed on the peer address of the connection.
///
/// Behind a reverse proxy every peer is the proxy, so proxy headers can be
/// trusted instead: Cloudflare's `CF-Connecting-IP` first, then
/// `X-Forwarded-For`, `X-Real-IP` and Fly's `Fly-Client-IP`. Clients can
/// set those headers themselves, so they are ignored unless trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trust_proxy_headers: bool) -> Self {
        Self { trust_proxy_headers }
    }
}

/// Client IP reported by a reverse proxy, if any.
fn proxy_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("cf-connecting-ip")
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        // First IP in the X-Forwarded-For chain
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| header("x-real-ip").and_then(|s| s.trim().parse::<IpAddr>().ok()))
        .or_else(|| header("fly-client-ip").and_then(|s| s.trim().parse::<IpAddr>().ok()))
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if self.trust_proxy_headers
            && let Some(ip) = proxy_client_ip(req.headers())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
///
/// Uses `ClientIpKeyExtractor` to get the client IP from the socket, or from
/// proxy headers when those are trusted.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// This slows brute force attempts against the backend login.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(key_extractor: ClientIpKeyExtractor) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key_extractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5) // Allow burst of 5 requests
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for the chat endpoint: ~20 requests per minute per IP.
///
/// Configuration: 1 request every 3 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(3)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn chat_rate_limiter(key_extractor: ClientIpKeyExtractor) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key_extractor)
        .per_second(3) // Replenish 1 token every 3 seconds (~20/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(3) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(forwarded_for: Option<&str>, peer: Option<[u8; 4]>) -> Request<()> {
        let mut builder = Request::builder();
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        }
        req
    }

    #[test]
    fn test_proxy_headers_ignored_by_default() {
        let req = request(Some("203.0.113.7"), Some([192, 0, 2, 4]));

        let ip = ClientIpKeyExtractor::default().extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trusted_proxy_header_wins_over_peer_address() {
        let req = request(Some("203.0.113.7, 10.0.0.1"), Some([10, 0, 0, 1]));

        let ip = ClientIpKeyExtractor::new(true).extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trusted_without_header_uses_peer_address() {
        let req = request(None, Some([192, 0, 2, 4]));

        let ip = ClientIpKeyExtractor::new(true).extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = request(Some("203.0.113.7"), None);
        assert!(ClientIpKeyExtractor::default().extract(&req).is_err());
    }
}
