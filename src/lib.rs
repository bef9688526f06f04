//! Anime Quotes API
//!
//! Quote lookups behind a request gate:
//! - Endpoint classification against a static route table
//! - API-key authentication with a validity cache in front of the durable store
//! - Fixed-window rate limiting per IP (anonymous) or per API key

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::cache::Cache;
use domain::endpoint::RouteTable;
use infrastructure::{
    api_key::{CredentialValidator, CredentialValidatorConfig},
    cache::CacheFactory,
    gate::RequestGate,
    quote::QuoteService,
    rate_limit::RateLimiter,
    storage::{Repositories, StorageFactory},
};
use tracing::info;

/// Application state with the configured backends
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let cache = CacheFactory::new()
        .create(&config.cache, config.cache_max_ttl())
        .await?;
    info!(backend = %config.cache.backend, "Counter store ready");

    let repositories = StorageFactory::create(&config.storage).await?;
    info!(backend = %config.storage.backend, "Durable store ready");

    Ok(build_app_state(config, cache, repositories))
}

/// Wires the gate and services over already-built stores
pub fn build_app_state(
    config: &AppConfig,
    cache: Arc<dyn Cache>,
    repositories: Repositories,
) -> AppState {
    let timeout = config.store.timeout();

    let validator = CredentialValidator::new(
        config.auth.key_format(),
        cache.clone(),
        repositories.api_keys.clone(),
    )
    .with_config(CredentialValidatorConfig {
        validity_ttl: config.auth.validity_ttl(),
        populate_cache: config.auth.populate_cache_on_lookup,
    })
    .with_timeout(timeout);

    let limiter = RateLimiter::new(cache.clone())
        .with_ip_policy(config.rate_limit.ip_policy())
        .with_key_policy(config.rate_limit.key_policy())
        .with_timeout(timeout);

    let gate = RequestGate::standard(
        RouteTable::quotes(),
        Arc::new(validator),
        Arc::new(limiter),
        config.rate_limit.fail_open,
    );

    let quote_service = QuoteService::new(repositories.quotes).with_timeout(timeout);

    AppState::new(
        Arc::new(quote_service),
        Arc::new(gate),
        cache,
        repositories.api_keys,
    )
    .with_store_timeout(timeout)
    .with_trust_forwarded_for(config.server.trust_forwarded_for)
}
