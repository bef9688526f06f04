//! Fixed-window rate limiting types

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use super::api_key::fingerprint;
use super::cache::CacheKey;

/// Quota for one class of subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    name: &'static str,
    max_requests: u64,
    window: Duration,
}

impl RateLimitPolicy {
    pub fn new(name: &'static str, max_requests: u64, window: Duration) -> Self {
        Self {
            name,
            max_requests,
            window,
        }
    }

    /// Default per-IP policy: 100 requests per hour
    pub fn per_ip() -> Self {
        Self::new("ip", 100, Duration::from_secs(3600))
    }

    /// Default per-key policy: 1000 requests per hour
    pub fn per_api_key() -> Self {
        Self::new("api_key", 1000, Duration::from_secs(3600))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decision for a post-increment count
    pub fn decide(&self, count: i64, reset_in: Option<Duration>) -> RateLimitDecision {
        let count = count.max(0) as u64;

        RateLimitDecision {
            allowed: count <= self.max_requests,
            count,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset_in: reset_in.unwrap_or(self.window),
        }
    }
}

/// What a counter is keyed on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitSubject {
    Ip(IpAddr),
    ApiKey(String),
}

impl RateLimitSubject {
    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::Ip(ip) => CacheKey::ip_counter(ip),
            Self::ApiKey(key) => CacheKey::key_counter(key),
        }
    }
}

/// Never prints a raw API key
impl fmt::Display for RateLimitSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "ip:{}", ip),
            Self::ApiKey(key) => write!(f, "key:{}", fingerprint(key)),
        }
    }
}

/// Outcome of one counted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub count: u64,
    pub limit: u64,
    pub remaining: u64,
    pub reset_in: Duration,
}
