//! Counter store selection at startup

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported counter store backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Process-local moka cache
    #[default]
    InMemory,
    /// Shared Redis instance
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

/// `cache` section of the application config
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheType,
    /// Required when `backend = "redis"`; `REDIS_URL` is used as a fallback
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// In-memory only; shared by counters and validity markers
    pub max_capacity: u64,
    pub connection_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            max_capacity: 100_000,
            connection_timeout_secs: 5,
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Factory for creating counter store instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates the configured backend.
    ///
    /// `max_ttl` bounds in-memory entry lifetime and must cover the longest
    /// rate-limit window and the validity TTL.
    pub async fn create(
        &self,
        config: &CacheConfig,
        max_ttl: Duration,
    ) -> Result<Arc<dyn Cache>, DomainError> {
        match config.backend {
            CacheType::InMemory => {
                let in_memory_config = InMemoryCacheConfig::default()
                    .with_max_capacity(config.max_capacity)
                    .with_max_ttl(max_ttl);

                Ok(Arc::new(InMemoryCache::with_config(in_memory_config)))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for the redis cache backend")
                })?;

                let mut redis_config = RedisCacheConfig::new(url).with_connection_timeout(
                    Duration::from_secs(config.connection_timeout_secs),
                );

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let cache = RedisCache::new(redis_config).await?;
                Ok(Arc::new(cache))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_type_deserialize() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"backend": "redis", "redis_url": "redis://x"}"#).unwrap();

        assert_eq!(config.backend, CacheType::Redis);
        assert_eq!(config.redis_url.as_deref(), Some("redis://x"));
        assert_eq!(config.max_capacity, 100_000);
    }

    #[test]
    fn test_cache_type_display() {
        assert_eq!(CacheType::InMemory.to_string(), "in_memory");
        assert_eq!(CacheType::Redis.to_string(), "redis");
    }

    #[tokio::test]
    async fn test_factory_creates_in_memory() {
        let cache = CacheFactory::new()
            .create(&CacheConfig::in_memory(), Duration::from_secs(60))
            .await
            .unwrap();

        cache
            .set_raw("key", "value", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.get_raw("key").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_factory_redis_requires_url() {
        let config = CacheConfig {
            backend: CacheType::Redis,
            ..Default::default()
        };

        let result = CacheFactory::new()
            .create(&config, Duration::from_secs(60))
            .await;

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
