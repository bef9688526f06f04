//! Counter store abstraction shared by rate limiting and key validation

mod key;
mod repository;

pub use key::{CacheKey, KeyNamespace};
pub use repository::{Cache, CacheExt, Counter};

#[cfg(test)]
pub use repository::mock::MockCache;
