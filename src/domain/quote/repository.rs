//! Quote repository trait

use async_trait::async_trait;

use super::entity::{PageRequest, QuoteFilter, QuoteRecord};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Joined, read-only quote queries
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Quote by id, `None` when missing or when a join is missing
    async fn get(&self, id: i64) -> Result<Option<QuoteRecord>, DomainError>;

    /// One random quote matching the filter
    async fn random(&self, filter: &QuoteFilter) -> Result<Option<QuoteRecord>, DomainError>;

    /// Quotes matching the filter ordered by id
    async fn list(
        &self,
        filter: &QuoteFilter,
        page: PageRequest,
    ) -> Result<Vec<QuoteRecord>, DomainError>;

    /// Round-trips to the backing store
    async fn ping(&self) -> Result<(), DomainError>;
}
