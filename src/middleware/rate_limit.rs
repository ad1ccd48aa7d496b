//! Rate limiting middleware.
//!
//! Simple in-memory rate limiting per IP address using a fixed window. Used to
//! slow down credential guessing on the unauthenticated auth endpoints.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Configuration for rate limiting.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window. Zero disables limiting.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// Burst allowance (extra requests above limit before hard reject).
    pub burst: u32,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
            burst: max_requests / 5,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(30)
    }
}

/// Rate limiter state tracking requests per IP.
#[derive(Clone)]
pub struct RateLimitLayer {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<IpAddr, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if request should be allowed.
    fn check(&self, ip: IpAddr) -> RateLimitResult {
        if self.config.max_requests == 0 {
            return RateLimitResult::Allowed;
        }

        let mut state = self.state.lock();
        let now = Instant::now();

        let entry = state.entry(ip).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        let limit = self.config.max_requests + self.config.burst;
        let reset_at = entry.window_start + self.config.window;

        if entry.count > limit {
            RateLimitResult::Exceeded {
                retry_after: reset_at.duration_since(now),
            }
        } else {
            RateLimitResult::Allowed
        }
    }

    /// Periodic cleanup of old entries (call from a background task).
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        let now = Instant::now();
        let window = self.config.window;

        state.retain(|_, entry| now.duration_since(entry.window_start) < window * 2);
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.state.lock().len()
    }
}

enum RateLimitResult {
    Allowed,
    Exceeded { retry_after: Duration },
}

/// Rate limiting middleware function.
///
/// Requests without connection info (e.g. in-process tests) share one bucket.
pub async fn rate_limit_middleware(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(limiter): State<RateLimitLayer>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(ip) {
        RateLimitResult::Allowed => next.run(request).await,
        RateLimitResult::Exceeded { retry_after } => {
            warn!(
                ip = %ip,
                path = %request.uri().path(),
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );

            let body = serde_json::json!({
                "error": "Too many requests. Please slow down.",
                "retry_after_seconds": retry_after.as_secs(),
            });

            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.as_secs().to_string())],
                axum::Json(body),
            )
                .into_response()
        }
    }
}
