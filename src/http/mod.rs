//! HTTP client module
//!
//! Transport used by the HTTP remote source: retries with backoff,
//! `Retry-After` handling and token bucket rate limiting.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
