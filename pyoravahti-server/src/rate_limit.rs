//! Per-client limit on report submissions.
//!
//! The global `tower_governor` layer protects the whole API; this limiter
//! additionally caps how many reports a single client can file within a
//! fixed window.

use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;

/// Client id used when no proxy header identifies the caller.
pub const FALLBACK_CLIENT_ID: &str = "127.0.0.1";

pub const RATE_LIMITED_MESSAGE: &str =
    "Liian monta ilmoitusta lyhyen ajan sisällä. Yritä myöhemmin uudelleen.";

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed window counter keyed by client id.
#[derive(Debug)]
pub struct ReportRateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl ReportRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    /// Record an attempt. Returns `false` when the client is over the limit.
    ///
    /// Rejected attempts do not extend the window.
    pub fn check(&self, client_id: &str) -> bool {
        self.check_at(client_id, Instant::now())
    }

    fn check_at(&self, client_id: &str, now: Instant) -> bool {
        let mut entry = self
            .windows
            .entry(client_id.to_string())
            .or_insert(Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now > entry.reset_at {
            *entry = Window {
                count: 0,
                reset_at: now + self.window,
            };
        }

        if entry.count >= self.limit {
            tracing::warn!(client = client_id, limit = self.limit, "Report rate limit exceeded");
            return false;
        }

        entry.count += 1;
        true
    }

    /// Drop windows that have already expired.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.windows.retain(|_, window| window.reset_at >= now);
    }
}

/// Identify the caller from proxy headers: first `x-forwarded-for` hop,
/// then `x-real-ip`, then the loopback fallback.
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .unwrap_or(FALLBACK_CLIENT_ID)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_limit_within_window() {
        let limiter = ReportRateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.check("10.0.0.1"));
        }
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn test_window_resets() {
        let limiter = ReportRateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start + Duration::from_secs(30)));
        assert!(limiter.check_at("a", start + Duration::from_secs(61)));
    }

    #[test]
    fn test_purge_expired() {
        let limiter = ReportRateLimiter::new(5, Duration::ZERO);
        limiter.check_at("a", Instant::now() - Duration::from_secs(1));
        limiter.purge_expired();
        assert!(limiter.windows.is_empty());
    }

    #[test]
    fn test_client_id_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_id(&headers), "203.0.113.7");

        headers.remove("x-forwarded-for");
        assert_eq!(client_id(&headers), "198.51.100.2");

        assert_eq!(client_id(&HeaderMap::new()), FALLBACK_CLIENT_ID);
    }
}
