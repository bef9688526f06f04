//! Quote service
//!
//! Runs repository queries under the store timeout and shapes the results.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::quote::{
    format_quote, FormattedQuote, PageRequest, QuoteFilter, QuoteRepository,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_store_error;
use crate::infrastructure::timeout::StoreTimeout;

/// Quote lookups exposed to the HTTP layer
#[async_trait]
pub trait QuoteServiceTrait: Send + Sync {
    async fn random(&self, filter: &QuoteFilter) -> Result<Option<FormattedQuote>, DomainError>;

    async fn get(&self, id: i64) -> Result<Option<FormattedQuote>, DomainError>;

    async fn list(
        &self,
        filter: &QuoteFilter,
        page: u32,
    ) -> Result<Vec<FormattedQuote>, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;
}

pub struct QuoteService {
    repository: Arc<dyn QuoteRepository>,
    timeout: StoreTimeout,
    per_page: u32,
}

impl std::fmt::Debug for QuoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteService")
            .field("timeout", &self.timeout)
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl QuoteService {
    pub fn new(repository: Arc<dyn QuoteRepository>) -> Self {
        Self {
            repository,
            timeout: StoreTimeout::default(),
            per_page: PageRequest::DEFAULT_PER_PAGE,
        }
    }

    pub fn with_timeout(mut self, timeout: StoreTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    fn observe<T>(result: Result<T, DomainError>, operation: &str) -> Result<T, DomainError> {
        if let Err(e) = &result {
            if e.is_store_failure() {
                warn!(operation, error = %e, "Quote query failed");
                record_store_error("database");
            }
        }
        result
    }
}

#[async_trait]
impl QuoteServiceTrait for QuoteService {
    async fn random(&self, filter: &QuoteFilter) -> Result<Option<FormattedQuote>, DomainError> {
        let record = self
            .timeout
            .run("random quote", self.repository.random(filter))
            .await;

        Self::observe(record, "random").map(|record| format_quote(record.as_ref()))
    }

    async fn get(&self, id: i64) -> Result<Option<FormattedQuote>, DomainError> {
        let record = self
            .timeout
            .run("quote by id", self.repository.get(id))
            .await;

        Self::observe(record, "get").map(|record| format_quote(record.as_ref()))
    }

    async fn list(
        &self,
        filter: &QuoteFilter,
        page: u32,
    ) -> Result<Vec<FormattedQuote>, DomainError> {
        let page = PageRequest::new(page, self.per_page);
        let records = self
            .timeout
            .run("list quotes", self.repository.list(filter, page))
            .await;

        Self::observe(records, "list")
            .map(|records| records.iter().map(FormattedQuote::from).collect())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.timeout
            .run("quote store ping", self.repository.ping())
            .await
    }
}
