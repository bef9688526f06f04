//! API key domain
//!
//! Key records, their syntactic format and the repository used to confirm
//! that a presented key exists.

mod entity;
mod repository;
mod validation;

pub use entity::{ApiKey, CachedKeyValidity};
pub use repository::ApiKeyRepository;
pub use validation::{
    fingerprint, ApiKeyFormat, ApiKeyValidationError, DEFAULT_KEY_PREFIX, DEFAULT_MIN_KEY_LENGTH,
};

#[cfg(test)]
pub use repository::MockApiKeyRepository;
