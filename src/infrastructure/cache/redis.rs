//! Redis counter store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};

use crate::domain::cache::{Cache, Counter};
use crate::domain::DomainError;

/// Increment, arm the expiry if the key has none, read the remaining TTL.
/// Runs as one script so concurrent gates never observe a counter without
/// an expiry.
const INCREMENT_SCRIPT: &str = r#"
local value = redis.call('INCRBY', KEYS[1], ARGV[1])
if redis.call('PTTL', KEYS[1]) < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return {value, redis.call('PTTL', KEYS[1])}
"#;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis-backed counter store shared by every API instance
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    increment_script: Script,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| {
            DomainError::cache(format!(
                "Timed out connecting to Redis after {:?}",
                config.connection_timeout
            ))
        })?
        .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            increment_script: Script::new(INCREMENT_SCRIPT),
            config,
        })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

fn command_error(command: &str, key: &str, error: RedisError) -> DomainError {
    DomainError::cache(format!("Redis {} on '{}' failed: {}", command, key, error))
}

/// Redis reports -2 for a missing key and -1 for a key without expiry
fn remaining(pttl_ms: i64) -> Option<Duration> {
    u64::try_from(pttl_ms).ok().map(Duration::from_millis)
}

fn whole_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| command_error("GET", key, e))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.pset_ex::<_, _, ()>(self.prefix_key(key), value, whole_millis(ttl))
            .await
            .map_err(|e| command_error("PSETEX", key, e))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let removed: u32 = conn
            .del(self.prefix_key(key))
            .await
            .map_err(|e| command_error("DEL", key, e))?;

        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(self.prefix_key(key))
            .await
            .map_err(|e| command_error("EXISTS", key, e))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let mut conn = self.connection.clone();

        let pttl_ms: i64 = conn
            .pttl(self.prefix_key(key))
            .await
            .map_err(|e| command_error("PTTL", key, e))?;

        Ok(remaining(pttl_ms))
    }

    async fn increment(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<Counter, DomainError> {
        let mut conn = self.connection.clone();

        let (value, pttl_ms): (i64, i64) = self
            .increment_script
            .key(self.prefix_key(key))
            .arg(delta)
            .arg(whole_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| command_error("increment script", key, e))?;

        Ok(Counter {
            value,
            ttl: remaining(pttl_ms),
        })
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| command_error("PING", "-", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;

    fn get_test_config() -> RedisCacheConfig {
        RedisCacheConfig::new("redis://127.0.0.1:6379").with_key_prefix("anime-quotes-test")
    }

    #[test]
    fn test_remaining_ignores_sentinels() {
        assert_eq!(remaining(-2), None);
        assert_eq!(remaining(-1), None);
        assert_eq!(remaining(1500), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_whole_millis_is_at_least_one() {
        assert_eq!(whole_millis(Duration::ZERO), 1);
        assert_eq!(whole_millis(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn test_config_builder() {
        let config = RedisCacheConfig::new("redis://cache:6379")
            .with_key_prefix("quotes")
            .with_connection_timeout(Duration::from_secs(1));

        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.key_prefix.as_deref(), Some("quotes"));
        assert_eq!(config.connection_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        cache
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        cache.delete("key1").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_increment_arms_expiry_once() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();
        cache.delete("counter").await.unwrap();

        let first = cache
            .increment("counter", 1, Duration::from_secs(30))
            .await
            .unwrap();
        let second = cache
            .increment("counter", 1, Duration::from_secs(600))
            .await
            .unwrap();

        assert_eq!(first.value, 1);
        assert_eq!(second.value, 2);
        assert!(second.ttl.unwrap() <= Duration::from_secs(30));

        cache.delete("counter").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_ping() {
        let cache = RedisCache::new(get_test_config()).await.unwrap();

        assert!(cache.ping().await.is_ok());
    }
}
