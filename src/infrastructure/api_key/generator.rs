//! API key generation
//!
//! Produces random keys that satisfy an [`ApiKeyFormat`]. Issuing a key
//! (storing it for an owner) happens outside the API.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

use crate::domain::api_key::{fingerprint, ApiKeyFormat};

/// A freshly generated key
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// The full key (shown once)
    pub key: String,
    /// Loggable digest prefix
    pub fingerprint: String,
}

/// Generator for random API keys
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    prefix: String,
    key_bytes: usize,
}

impl ApiKeyGenerator {
    /// 42 random bytes encode to 56 characters, so `ani-` keys come out at 60
    pub const DEFAULT_KEY_BYTES: usize = 42;

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: Self::DEFAULT_KEY_BYTES,
        }
    }

    /// Sized so every generated key passes `format`
    pub fn for_format(format: &ApiKeyFormat) -> Self {
        let needed_chars = format.min_length().saturating_sub(format.prefix().chars().count());
        // Unpadded base64 yields ceil(4n / 3) characters for n bytes
        let key_bytes = (needed_chars * 3).div_ceil(4).max(Self::DEFAULT_KEY_BYTES);

        Self::new(format.prefix()).with_key_bytes(key_bytes)
    }

    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes;
        self
    }

    pub fn generate(&self) -> GeneratedApiKey {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let key = format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(&random_bytes));

        GeneratedApiKey {
            fingerprint: fingerprint(&key),
            key,
        }
    }
}

impl Default for ApiKeyGenerator {
    fn default() -> Self {
        Self::for_format(&ApiKeyFormat::default())
    }
}
