//! In-memory counter store using moka

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};

use crate::domain::cache::{Cache, Counter};
use crate::domain::DomainError;

/// moka rejects a time-to-live above 1000 years
const TTL_CEILING: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries, counters and validity markers together.
    ///
    /// Once full, moka evicts or refuses entries by frequency, so a live
    /// counter can be dropped and its subject starts a fresh window. Size
    /// this above the number of distinct clients expected per window.
    pub max_capacity: u64,
    /// Ceiling on any entry's lifetime; must cover the longest window or TTL in use
    pub max_ttl: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
            max_ttl: Duration::from_secs(3600),
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    /// Millis since epoch
    expires_at: u64,
}

impl CacheEntry {
    fn new(data: String, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: now_millis().saturating_add(duration_millis(ttl)),
        }
    }

    fn remaining(&self, now: u64) -> Option<Duration> {
        (self.expires_at > now).then(|| Duration::from_millis(self.expires_at - now))
    }
}

fn now_millis() -> u64 {
    duration_millis(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default(),
    )
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Process-local counter store.
///
/// Entries carry their own deadline; moka's time-to-live only bounds memory.
/// Counter increments go through moka's per-key compute so concurrent
/// requests for one subject are serialised.
#[derive(Debug)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
    max_capacity: u64,
    capacity_warned: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.max_ttl.min(TTL_CEILING))
            .build();

        Self {
            cache,
            max_capacity: config.max_capacity,
            capacity_warned: AtomicBool::new(false),
        }
    }

    /// Approximate; moka applies pending writes lazily
    fn at_capacity(&self) -> bool {
        self.cache.entry_count() >= self.max_capacity
    }

    /// Warns once per cache when new entries may start evicting live counters
    fn warn_if_full(&self) {
        if self.at_capacity() && !self.capacity_warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                max_capacity = self.max_capacity,
                "In-memory counter store is full; rate-limit windows may reset early"
            );
        }
    }

    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;

        if entry.remaining(now_millis()).is_none() {
            self.cache.remove(key).await;
            return None;
        }

        Some(entry)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.cache
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl))
            .await;
        self.warn_if_full();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        Ok(self
            .live_entry(key)
            .await
            .and_then(|entry| entry.remaining(now_millis())))
    }

    async fn increment(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<Counter, DomainError> {
        let now = now_millis();

        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|current| {
                // A missing, expired or non-numeric entry starts a new window
                let next = match current.map(|entry| entry.into_value()) {
                    Some(entry) if entry.remaining(now).is_some() => {
                        match entry.data.parse::<i64>() {
                            Ok(value) => CacheEntry {
                                data: (value + delta).to_string(),
                                expires_at: entry.expires_at,
                            },
                            Err(_) => CacheEntry::new(delta.to_string(), ttl),
                        }
                    }
                    _ => CacheEntry::new(delta.to_string(), ttl),
                };

                std::future::ready(Op::Put(next))
            })
            .await;

        let entry = match result {
            CompResult::Inserted(entry) => {
                self.warn_if_full();
                entry.into_value()
            }
            CompResult::ReplacedWith(entry) => entry.into_value(),
            _ => {
                return Err(DomainError::cache(format!(
                    "Counter '{}' was not written",
                    key
                )));
            }
        };

        let value = entry.data.parse::<i64>().map_err(|e| {
            DomainError::cache(format!("Counter '{}' is not an integer: {}", key, e))
        })?;

        Ok(Counter {
            value,
            ttl: entry.remaining(now_millis()),
        })
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();

        cache
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        let result: Option<String> = cache.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.delete("key1").await.unwrap());
        assert!(!cache.exists("key1").await.unwrap());
        assert!(!cache.delete("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "1", Duration::from_millis(50))
            .await
            .unwrap();

        assert!(cache.exists("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get_raw("key1").await.unwrap().is_none());
        assert!(cache.ttl("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_remaining() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("key1", "1", Duration::from_secs(60))
            .await
            .unwrap();

        let remaining = cache.ttl("key1").await.unwrap().unwrap();
        assert!(remaining.as_secs() > 50 && remaining.as_secs() <= 60);
    }

    #[tokio::test]
    async fn test_increment_starts_window() {
        let cache = InMemoryCache::new();

        let first = cache
            .increment("rl_ip:1.2.3.4", 1, Duration::from_secs(60))
            .await
            .unwrap();
        let second = cache
            .increment("rl_ip:1.2.3.4", 1, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(first.value, 1);
        assert_eq!(second.value, 2);
        assert!(second.ttl.unwrap() <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_increment_does_not_extend_window() {
        let cache = InMemoryCache::new();

        cache
            .increment("counter", 1, Duration::from_secs(10))
            .await
            .unwrap();
        let later = cache
            .increment("counter", 1, Duration::from_secs(600))
            .await
            .unwrap();

        assert!(later.ttl.unwrap() <= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_increment_resets_after_expiry() {
        let cache = InMemoryCache::new();

        cache
            .increment("counter", 1, Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .increment("counter", 1, Duration::from_millis(50))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let fresh = cache
            .increment("counter", 1, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(fresh.value, 1);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_atomic() {
        let cache = Arc::new(InMemoryCache::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .increment("shared", 1, Duration::from_secs(60))
                    .await
                    .unwrap()
                    .value
            }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort_unstable();

        assert_eq!(values, (1..=50).collect::<Vec<i64>>());
        assert_eq!(cache.get_raw("shared").await.unwrap(), Some("50".to_string()));
    }

    #[tokio::test]
    async fn test_increment_overwrites_non_numeric_value() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("counter", "not-a-number", Duration::from_secs(60))
            .await
            .unwrap();

        let counter = cache
            .increment("counter", 1, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(counter.value, 1);
    }

    #[tokio::test]
    async fn test_oversized_ttl_does_not_overflow() {
        let huge = Duration::from_secs(u64::MAX / 1000);
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_ttl(huge));

        let counter = cache.increment("counter", 1, huge).await.unwrap();

        assert_eq!(counter.value, 1);
        assert!(counter.ttl.is_some());
        assert_eq!(CacheEntry::new("1".to_string(), Duration::MAX).expires_at, u64::MAX);
    }

    #[tokio::test]
    async fn test_at_capacity() {
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_capacity(4));

        cache.increment("rl_ip:a", 1, Duration::from_secs(60)).await.unwrap();
        cache.cache.run_pending_tasks().await;
        assert!(!cache.at_capacity());

        for key in ["rl_ip:b", "rl_ip:c", "rl_key:d"] {
            cache.increment(key, 1, Duration::from_secs(60)).await.unwrap();
        }
        cache.cache.run_pending_tasks().await;
        assert!(cache.at_capacity());

        cache.warn_if_full();
        assert!(cache.capacity_warned.load(Ordering::Relaxed));
    }

    #[test]
    fn test_config() {
        let config = InMemoryCacheConfig::default()
            .with_max_capacity(100)
            .with_max_ttl(Duration::from_secs(300));

        assert_eq!(config.max_capacity, 100);
        assert_eq!(config.max_ttl, Duration::from_secs(300));
    }
}
