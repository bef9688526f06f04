//! API key infrastructure
//!
//! Repositories, key generation and the credential validator used by the
//! request gate.

mod generator;
mod in_memory_repository;
mod postgres_repository;
mod validator;

pub use generator::{ApiKeyGenerator, GeneratedApiKey};
pub use in_memory_repository::InMemoryApiKeyRepository;
pub use postgres_repository::PostgresApiKeyRepository;
pub use validator::{
    CacheLookup, CredentialSource, CredentialValidator, CredentialValidatorConfig, InvalidReason,
    KeyValidity,
};
