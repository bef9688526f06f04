//! Counter store key namespaces

use std::fmt;
use std::net::IpAddr;

/// Namespaces sharing the counter store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
    /// Confirmed-valid API keys
    KeyValidity,
    /// Per-IP request counters
    IpCounter,
    /// Per-API-key request counters
    KeyCounter,
}

impl KeyNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::KeyValidity => "rl_api",
            Self::IpCounter => "rl_ip",
            Self::KeyCounter => "rl_key",
        }
    }
}

/// Fully qualified key in the counter store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: KeyNamespace, subject: impl fmt::Display) -> Self {
        Self(format!("{}:{}", namespace.prefix(), subject))
    }

    /// `rl_api:<key>`
    pub fn key_validity(api_key: &str) -> Self {
        Self::new(KeyNamespace::KeyValidity, api_key)
    }

    /// `rl_ip:<ip>`
    pub fn ip_counter(ip: &IpAddr) -> Self {
        Self::new(KeyNamespace::IpCounter, ip)
    }

    /// `rl_key:<key>`
    pub fn key_counter(api_key: &str) -> Self {
        Self::new(KeyNamespace::KeyCounter, api_key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
