//! Credential validation
//!
//! Three steps, cheapest first: a pure syntax check, a read of the validity
//! cache, then an exact-match lookup in the durable store. The gate runs
//! them as separate stages; [`CredentialValidator::validate`] composes them
//! for callers that only need the verdict.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::api_key::{
    fingerprint, ApiKey, ApiKeyFormat, ApiKeyRepository, ApiKeyValidationError, CachedKeyValidity,
};
use crate::domain::cache::{Cache, CacheExt, CacheKey};
use crate::infrastructure::observability::record_store_error;
use crate::infrastructure::timeout::StoreTimeout;

/// Where a positive verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Cache,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    Malformed(ApiKeyValidationError),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValidity {
    Valid {
        source: CredentialSource,
        owner: Option<String>,
    },
    Invalid(InvalidReason),
}

impl KeyValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Result of the validity cache read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Owner is known when the marker was written by this service
    Hit { owner: Option<String> },
    Miss,
}

#[derive(Debug, Clone)]
pub struct CredentialValidatorConfig {
    pub validity_ttl: Duration,
    pub populate_cache: bool,
}

impl Default for CredentialValidatorConfig {
    fn default() -> Self {
        Self {
            validity_ttl: Duration::from_secs(3600),
            populate_cache: true,
        }
    }
}

pub struct CredentialValidator {
    format: ApiKeyFormat,
    cache: Arc<dyn Cache>,
    repository: Arc<dyn ApiKeyRepository>,
    config: CredentialValidatorConfig,
    timeout: StoreTimeout,
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("format", &self.format)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CredentialValidator {
    pub fn new(
        format: ApiKeyFormat,
        cache: Arc<dyn Cache>,
        repository: Arc<dyn ApiKeyRepository>,
    ) -> Self {
        Self {
            format,
            cache,
            repository,
            config: CredentialValidatorConfig::default(),
            timeout: StoreTimeout::default(),
        }
    }

    pub fn with_config(mut self, config: CredentialValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: StoreTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn format(&self) -> &ApiKeyFormat {
        &self.format
    }

    pub fn check_syntax(&self, key: &str) -> Result<(), ApiKeyValidationError> {
        self.format.validate(key)
    }

    /// Reads `rl_api:<key>`. A failed read counts as a miss.
    pub async fn cached(&self, key: &str) -> CacheLookup {
        let cache_key = CacheKey::key_validity(key);

        let raw = self
            .timeout
            .run("validity cache read", self.cache.get_raw(cache_key.as_str()))
            .await;

        match raw {
            Ok(Some(raw)) => {
                let owner = serde_json::from_str::<CachedKeyValidity>(&raw)
                    .ok()
                    .map(|marker| marker.owner);
                CacheLookup::Hit { owner }
            }
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(
                    key_fingerprint = %fingerprint(key),
                    error = %e,
                    "Validity cache read failed, falling back to durable lookup"
                );
                record_store_error("cache");
                CacheLookup::Miss
            }
        }
    }

    /// Exact-match durable lookup. Failures are treated as "not found".
    /// A hit is written back to the validity cache when population is on.
    pub async fn lookup(&self, key: &str) -> Option<ApiKey> {
        let found = self
            .timeout
            .run("api key lookup", self.repository.find_by_key(key))
            .await;

        let api_key = match found {
            Ok(api_key) => api_key?,
            Err(e) => {
                warn!(
                    key_fingerprint = %fingerprint(key),
                    error = %e,
                    "API key lookup failed, rejecting credential"
                );
                record_store_error("database");
                return None;
            }
        };

        if self.config.populate_cache {
            self.remember(&api_key).await;
        }

        Some(api_key)
    }

    async fn remember(&self, api_key: &ApiKey) {
        let cache_key = CacheKey::key_validity(api_key.key());
        let marker = CachedKeyValidity::from(api_key);

        let written = self
            .timeout
            .run(
                "validity cache write",
                self.cache
                    .set(cache_key.as_str(), &marker, self.config.validity_ttl),
            )
            .await;

        match written {
            Ok(()) => debug!(
                key_fingerprint = %api_key.fingerprint(),
                ttl_secs = self.config.validity_ttl.as_secs(),
                "Cached API key validity"
            ),
            Err(e) => {
                warn!(
                    key_fingerprint = %api_key.fingerprint(),
                    error = %e,
                    "Failed to cache API key validity"
                );
                record_store_error("cache");
            }
        }
    }

    pub async fn validate(&self, key: &str) -> KeyValidity {
        if let Err(e) = self.check_syntax(key) {
            return KeyValidity::Invalid(InvalidReason::Malformed(e));
        }

        if let CacheLookup::Hit { owner } = self.cached(key).await {
            return KeyValidity::Valid {
                source: CredentialSource::Cache,
                owner,
            };
        }

        match self.lookup(key).await {
            Some(api_key) => KeyValidity::Valid {
                source: CredentialSource::Store,
                owner: Some(api_key.owner().to_string()),
            },
            None => KeyValidity::Invalid(InvalidReason::Unknown),
        }
    }
}
