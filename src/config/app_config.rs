use std::time::Duration;

use serde::Deserialize;

use crate::domain::api_key::{ApiKeyFormat, DEFAULT_KEY_PREFIX, DEFAULT_MIN_KEY_LENGTH};
use crate::domain::rate_limit::RateLimitPolicy;
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::logging::LoggingConfig;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::StorageConfig;
use crate::infrastructure::timeout::StoreTimeout;

/// Upper bound on rate-limit windows and the key validity TTL
pub const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub store: StoreConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client IP from the first `X-Forwarded-For` entry
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            trust_forwarded_for: false,
        }
    }
}

/// Timeout applied to every counter store and durable store call
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: StoreTimeout::DEFAULT.as_millis() as u64,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> StoreTimeout {
        StoreTimeout::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PolicyConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl PolicyConfig {
    pub fn policy(&self, name: &'static str) -> RateLimitPolicy {
        RateLimitPolicy::new(name, self.max_requests, Duration::from_secs(self.window_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub ip: PolicyConfig,
    pub api_key: PolicyConfig,
    /// Admit requests when the counter store is unreachable
    pub fail_open: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip: PolicyConfig {
                max_requests: 100,
                window_secs: 3600,
            },
            api_key: PolicyConfig {
                max_requests: 1000,
                window_secs: 3600,
            },
            fail_open: false,
        }
    }
}

impl RateLimitConfig {
    pub fn ip_policy(&self) -> RateLimitPolicy {
        self.ip.policy("ip")
    }

    pub fn key_policy(&self) -> RateLimitPolicy {
        self.api_key.policy("api_key")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub key_prefix: String,
    pub min_key_length: usize,
    pub validity_ttl_secs: u64,
    /// Remember keys confirmed by the durable store
    pub populate_cache_on_lookup: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            min_key_length: DEFAULT_MIN_KEY_LENGTH,
            validity_ttl_secs: 3600,
            populate_cache_on_lookup: true,
        }
    }
}

impl AuthConfig {
    pub fn key_format(&self) -> ApiKeyFormat {
        ApiKeyFormat::new(self.key_prefix.clone(), self.min_key_length)
    }

    pub fn validity_ttl(&self) -> Duration {
        Duration::from_secs(self.validity_ttl_secs)
    }
}

impl AppConfig {
    /// Layers `config/default`, `config/local` and `APP__*` env vars.
    /// `DATABASE_URL` and `REDIS_URL` fill in missing store URLs.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_env(None)
    }

    /// `env` replaces the process environment when given
    fn load_with_env(
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;
        app_config.apply_url_fallbacks(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("REDIS_URL").ok(),
        );

        Ok(app_config)
    }

    fn apply_url_fallbacks(&mut self, database_url: Option<String>, redis_url: Option<String>) {
        if self.storage.database_url.is_none() {
            self.storage.database_url = database_url;
        }
        if self.cache.redis_url.is_none() {
            self.cache.redis_url = redis_url;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, policy) in [("ip", &self.rate_limit.ip), ("api_key", &self.rate_limit.api_key)] {
            if policy.max_requests == 0 || policy.window_secs == 0 {
                return Err(DomainError::configuration(format!(
                    "rate_limit.{} needs a positive max_requests and window_secs",
                    name
                )));
            }
            if policy.window_secs > MAX_LIFETIME_SECS {
                return Err(DomainError::configuration(format!(
                    "rate_limit.{}.window_secs must be at most {}",
                    name, MAX_LIFETIME_SECS
                )));
            }
        }

        if self.auth.validity_ttl_secs == 0 || self.auth.validity_ttl_secs > MAX_LIFETIME_SECS {
            return Err(DomainError::configuration(format!(
                "auth.validity_ttl_secs must be between 1 and {}",
                MAX_LIFETIME_SECS
            )));
        }

        if self.auth.key_prefix.is_empty() {
            return Err(DomainError::configuration("auth.key_prefix must not be empty"));
        }

        if self.store.timeout_ms == 0 {
            return Err(DomainError::configuration("store.timeout_ms must be positive"));
        }

        Ok(())
    }

    /// Longest lifetime any counter store entry needs
    pub fn cache_max_ttl(&self) -> Duration {
        [
            self.rate_limit.ip_policy().window(),
            self.rate_limit.key_policy().window(),
            self.auth.validity_ttl(),
        ]
        .into_iter()
        .max()
        .unwrap_or(Duration::from_secs(3600))
    }
}
