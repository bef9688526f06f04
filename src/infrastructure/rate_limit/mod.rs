//! Rate limiting backed by the shared counter store

mod rate_limiter;

pub use rate_limiter::{KeyRateLimit, RateLimiter};
