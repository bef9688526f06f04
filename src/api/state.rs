//! Application state shared by handlers and middleware

use std::sync::Arc;

use crate::domain::api_key::ApiKeyRepository;
use crate::domain::cache::Cache;
use crate::infrastructure::gate::RequestGate;
use crate::infrastructure::quote::QuoteServiceTrait;
use crate::infrastructure::timeout::StoreTimeout;

#[derive(Clone)]
pub struct AppState {
    pub quote_service: Arc<dyn QuoteServiceTrait>,
    pub gate: Arc<RequestGate>,
    /// Probed by `/ready`
    pub cache: Arc<dyn Cache>,
    /// Probed by `/ready`
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub store_timeout: StoreTimeout,
    /// Resolve the client IP from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gate", &self.gate)
            .field("store_timeout", &self.store_timeout)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        quote_service: Arc<dyn QuoteServiceTrait>,
        gate: Arc<RequestGate>,
        cache: Arc<dyn Cache>,
        api_keys: Arc<dyn ApiKeyRepository>,
    ) -> Self {
        Self {
            quote_service,
            gate,
            cache,
            api_keys,
            store_timeout: StoreTimeout::default(),
            trust_forwarded_for: false,
        }
    }

    pub fn with_store_timeout(mut self, timeout: StoreTimeout) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}
