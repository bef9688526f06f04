//! Durable store selection at startup

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::domain::api_key::{ApiKey, ApiKeyRepository};
use crate::domain::quote::QuoteRepository;
use crate::domain::DomainError;
use crate::infrastructure::api_key::{InMemoryApiKeyRepository, PostgresApiKeyRepository};
use crate::infrastructure::quote::{InMemoryQuoteRepository, PostgresQuoteRepository};

use super::migrations::run_storage_migrations;
use super::postgres::PostgresConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Sample catalogue in process memory
    #[default]
    InMemory,
    Postgres,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::InMemory => write!(f, "in_memory"),
            StorageType::Postgres => write!(f, "postgres"),
        }
    }
}

/// A key seeded into the in-memory backend
#[derive(Debug, Clone, Deserialize)]
pub struct SeedApiKey {
    pub key: String,
    #[serde(default = "default_seed_owner")]
    pub owner: String,
}

fn default_seed_owner() -> String {
    "seed".to_string()
}

/// `storage` section of the application config
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageType,
    /// Required when `backend = "postgres"`; `DATABASE_URL` is used as a fallback
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub run_migrations: bool,
    /// In-memory only
    pub seed_api_keys: Vec<SeedApiKey>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageType::InMemory,
            database_url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            run_migrations: true,
            seed_api_keys: Vec::new(),
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn postgres(url: impl Into<String>) -> Self {
        Self {
            backend: StorageType::Postgres,
            database_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_seed_key(mut self, key: impl Into<String>, owner: impl Into<String>) -> Self {
        self.seed_api_keys.push(SeedApiKey {
            key: key.into(),
            owner: owner.into(),
        });
        self
    }

    fn postgres_config(&self) -> Result<PostgresConfig, DomainError> {
        let url = self.database_url.clone().ok_or_else(|| {
            DomainError::configuration("storage.database_url is required for the postgres backend")
        })?;

        Ok(PostgresConfig::new(url)
            .with_pool_size(self.min_connections, self.max_connections)
            .with_acquire_timeout(Duration::from_secs(self.connect_timeout_secs)))
    }
}

/// The durable record stores the app reads from
#[derive(Clone)]
pub struct Repositories {
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<Repositories, DomainError> {
        info!(backend = %config.backend, "Creating durable store");

        match config.backend {
            StorageType::InMemory => Ok(Self::create_in_memory(config)),
            StorageType::Postgres => {
                let pool = config.postgres_config()?.connect().await?;

                if config.run_migrations {
                    run_storage_migrations(&pool).await?;
                }

                Ok(Repositories {
                    api_keys: Arc::new(PostgresApiKeyRepository::new(pool.clone())),
                    quotes: Arc::new(PostgresQuoteRepository::new(pool)),
                })
            }
        }
    }

    pub fn create_in_memory(config: &StorageConfig) -> Repositories {
        let keys = config
            .seed_api_keys
            .iter()
            .map(|seed| ApiKey::new(seed.key.clone(), seed.owner.clone()));

        Repositories {
            api_keys: Arc::new(InMemoryApiKeyRepository::with_keys(keys)),
            quotes: Arc::new(InMemoryQuoteRepository::with_sample_data()),
        }
    }
}
