//! API key format rules

use sha2::{Digest, Sha256};
use thiserror::Error;

pub const DEFAULT_KEY_PREFIX: &str = "ani-";
pub const DEFAULT_MIN_KEY_LENGTH: usize = 60;

const FINGERPRINT_LENGTH: usize = 12;

/// Reasons a presented key is rejected before any store access
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiKeyValidationError {
    #[error("API key must start with '{0}'")]
    MissingPrefix(String),

    #[error("API key must be at least {min} characters long, got {actual}")]
    TooShort { min: usize, actual: usize },
}

/// Syntactic contract for API keys: a fixed prefix and a minimum length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyFormat {
    prefix: String,
    min_length: usize,
}

impl Default for ApiKeyFormat {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX, DEFAULT_MIN_KEY_LENGTH)
    }
}

impl ApiKeyFormat {
    pub fn new(prefix: impl Into<String>, min_length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            min_length,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Checks prefix and total length (in characters). Pure, no I/O.
    pub fn validate(&self, candidate: &str) -> Result<(), ApiKeyValidationError> {
        if !candidate.starts_with(&self.prefix) {
            return Err(ApiKeyValidationError::MissingPrefix(self.prefix.clone()));
        }

        let actual = candidate.chars().count();

        if actual < self.min_length {
            return Err(ApiKeyValidationError::TooShort {
                min: self.min_length,
                actual,
            });
        }

        Ok(())
    }
}

/// First 12 hex chars of the SHA-256 digest; safe to log
pub fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LENGTH);
    encoded
}
