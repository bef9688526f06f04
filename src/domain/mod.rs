//! Domain layer - gate rules, entities and repository contracts

pub mod api_key;
pub mod cache;
pub mod endpoint;
pub mod error;
pub mod gate;
pub mod quote;
pub mod rate_limit;

pub use api_key::{ApiKey, ApiKeyFormat, ApiKeyRepository, ApiKeyValidationError, CachedKeyValidity};
pub use cache::{Cache, CacheExt, CacheKey, Counter};
pub use endpoint::{classify, EndpointClass, RouteTable};
pub use error::DomainError;
pub use gate::{Admission, ClientIdentity, GateRejection, GateRequest, StageOutcome};
pub use quote::{format_quote, FormattedQuote, QuoteFilter, QuoteRecord, QuoteRepository};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitSubject};
