//! Fixed-window rate limiter
//!
//! One atomic increment per decision. The counter store owns the window:
//! the first increment arms the expiry and the count resets when it lapses.
//! Rejected requests are counted too.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use crate::domain::cache::Cache;
use crate::domain::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitSubject};
use crate::domain::DomainError;
use crate::infrastructure::timeout::StoreTimeout;

pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    ip_policy: RateLimitPolicy,
    key_policy: RateLimitPolicy,
    timeout: StoreTimeout,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("ip_policy", &self.ip_policy)
            .field("key_policy", &self.key_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            ip_policy: RateLimitPolicy::per_ip(),
            key_policy: RateLimitPolicy::per_api_key(),
            timeout: StoreTimeout::default(),
        }
    }

    pub fn with_ip_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.ip_policy = policy;
        self
    }

    pub fn with_key_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: StoreTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ip_policy(&self) -> &RateLimitPolicy {
        &self.ip_policy
    }

    pub fn key_policy(&self) -> &RateLimitPolicy {
        &self.key_policy
    }

    /// Counts a request against the client IP
    pub async fn limit_by_ip(&self, ip: IpAddr) -> Result<RateLimitDecision, DomainError> {
        self.check(&RateLimitSubject::Ip(ip), &self.ip_policy).await
    }

    /// A check bound to `api_key`, run with [`KeyRateLimit::check`]
    pub fn limit_by_api_key(&self, api_key: &str) -> KeyRateLimit<'_> {
        KeyRateLimit {
            limiter: self,
            subject: RateLimitSubject::ApiKey(api_key.to_string()),
        }
    }

    async fn check(
        &self,
        subject: &RateLimitSubject,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, DomainError> {
        let key = subject.cache_key();

        let counter = self
            .timeout
            .run(
                "rate limit increment",
                self.cache.increment(key.as_str(), 1, policy.window()),
            )
            .await?;

        let decision = policy.decide(counter.value, counter.ttl);

        debug!(
            subject = %subject,
            policy = policy.name(),
            count = decision.count,
            limit = decision.limit,
            allowed = decision.allowed,
            "Rate limit checked"
        );

        Ok(decision)
    }
}

/// Rate-limit check bound to one API key
#[derive(Debug)]
pub struct KeyRateLimit<'a> {
    limiter: &'a RateLimiter,
    subject: RateLimitSubject,
}

impl KeyRateLimit<'_> {
    pub async fn check(self) -> Result<RateLimitDecision, DomainError> {
        self.limiter
            .check(&self.subject, &self.limiter.key_policy)
            .await
    }
}
