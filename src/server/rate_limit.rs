//! Fixed-window request limiting per client and wall-clock minute.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ArenaError;
use crate::server::error::ApiError;

pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Request counts keyed by `(client, minute)`.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    counts: HashMap<(String, u64), u32>,
}

impl RateLimitStore {
    pub fn count(&self, client: &str, minute: u64) -> u32 {
        self.counts
            .get(&(client.to_string(), minute))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn increment(&mut self, client: &str, minute: u64) {
        *self.counts.entry((client.to_string(), minute)).or_insert(0) += 1;
    }

    /// Drop every window older than `minute`.
    fn sweep(&mut self, minute: u64) {
        self.counts.retain(|(_, m), _| *m >= minute);
    }
}

pub struct RateLimiter {
    limit: u32,
    clock: Arc<dyn Clock>,
    store: Mutex<RateLimitStore>,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self::with_clock(limit, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            clock,
            store: Mutex::new(RateLimitStore::default()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Count one request from `client`; `false` once the client is over the limit
    /// for the current minute. Rejected requests are not counted.
    pub fn check(&self, client: &str) -> bool {
        let minute = self.clock.now_secs() / 60;
        let mut store = match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        store.sweep(minute);
        if store.count(client, minute) >= self.limit {
            tracing::warn!(client, limit = self.limit, "Rate limit exceeded");
            return false;
        }
        store.increment(client, minute);
        true
    }

    /// Number of tracked `(client, minute)` windows.
    pub fn tracked_windows(&self) -> usize {
        match self.store.lock() {
            Ok(store) => store.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Peer address, then the first `x-forwarded-for` entry, then `unknown`.
pub fn client_key(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_requests(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(peer, request.headers());

    if !limiter.check(&client) {
        return ApiError::from(ArenaError::TooManyRequests).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock that only moves when told to.
    #[derive(Debug, Default)]
    pub(crate) struct ManualClock(AtomicU64);

    impl ManualClock {
        pub(crate) fn at(secs: u64) -> Self {
            Self(AtomicU64::new(secs))
        }

        pub(crate) fn advance(&self, secs: u64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_secs(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn limits_within_a_minute() {
        let limiter = RateLimiter::with_clock(2, Arc::new(ManualClock::at(600)));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        // Other clients have their own window.
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn next_minute_resets_and_sweeps() {
        let clock = Arc::new(ManualClock::at(600));
        let limiter = RateLimiter::with_clock(1, clock.clone());
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
        assert_eq!(limiter.tracked_windows(), 2);

        clock.advance(60);
        assert!(limiter.check("a"));
        assert_eq!(limiter.tracked_windows(), 1);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = RateLimiter::with_clock(0, Arc::new(ManualClock::at(0)));
        assert!(!limiter.check("a"));
        assert_eq!(limiter.tracked_windows(), 0);
    }

    #[test]
    fn client_key_fallbacks() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(None, &headers), "unknown");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(None, &headers), "203.0.113.7");

        let peer: SocketAddr = "192.0.2.1:4321".parse().unwrap();
        assert_eq!(client_key(Some(peer), &headers), "192.0.2.1");
    }
}
