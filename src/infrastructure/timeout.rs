//! Bounded waits for store calls

use std::future::Future;
use std::time::Duration;

use crate::domain::DomainError;

/// Upper bound applied to every counter store and durable store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeout(Duration);

impl StoreTimeout {
    pub const DEFAULT: Duration = Duration::from_millis(2000);

    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Runs `future`, mapping an elapsed deadline to `DomainError::Timeout`
    pub async fn run<T, F>(&self, operation: &str, future: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.0, future).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(operation, self.0)),
        }
    }
}

impl Default for StoreTimeout {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}
