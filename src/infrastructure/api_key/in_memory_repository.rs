//! In-memory API key repository

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyRepository};
use crate::domain::DomainError;

/// API keys held in process memory, for local runs and tests
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<HashMap<String, ApiKey>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: impl IntoIterator<Item = ApiKey>) -> Self {
        let keys = keys
            .into_iter()
            .map(|api_key| (api_key.key().to_string(), api_key))
            .collect();

        Self {
            keys: RwLock::new(keys),
        }
    }

    pub async fn insert(&self, api_key: ApiKey) {
        self.keys
            .write()
            .await
            .insert(api_key.key().to_string(), api_key);
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>, DomainError> {
        Ok(self.keys.read().await.get(key).cloned())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_match_lookup() {
        let key = format!("ani-{}", "a".repeat(56));
        let repository = InMemoryApiKeyRepository::with_keys([ApiKey::new(key.clone(), "docs")]);

        let found = repository.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(found.owner(), "docs");

        let upper = key.to_uppercase();
        assert!(repository.find_by_key(&upper).await.unwrap().is_none());
        assert!(repository.find_by_key(&key[..40]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert() {
        let repository = InMemoryApiKeyRepository::new();
        repository.insert(ApiKey::new("ani-new", "cli")).await;

        assert_eq!(repository.len().await, 1);
        assert!(repository.find_by_key("ani-new").await.unwrap().is_some());
    }
}
