//! API key repository trait

use async_trait::async_trait;

use super::entity::ApiKey;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Read-only access to durably stored API keys
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Exact-match lookup by the full key
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Round-trips to the backing store
    async fn ping(&self) -> Result<(), DomainError>;
}
