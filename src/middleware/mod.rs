//! HTTP middleware.
//!
//! - Request logging with latency tracking
//! - Per-IP rate limiting for credential endpoints

pub mod logging;
pub mod rate_limit;

pub use logging::request_logging;
pub use rate_limit::{RateLimitConfig, RateLimitLayer};
