//! API key entity and cached validity marker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::fingerprint;

/// Durable API key record
///
/// Keys are issued out-of-band. The gate only ever checks existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    key: String,
    owner: String,
    created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn new(key: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            owner: owner.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Loggable stand-in for the secret
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.key)
    }
}

/// Marker written to `rl_api:<key>` once a key has been confirmed valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedKeyValidity {
    pub owner: String,
    pub validated_at: DateTime<Utc>,
}

impl From<&ApiKey> for CachedKeyValidity {
    fn from(api_key: &ApiKey) -> Self {
        Self {
            owner: api_key.owner.clone(),
            validated_at: Utc::now(),
        }
    }
}
