//! Counter store backends

mod factory;
mod in_memory;
mod redis;

pub use self::redis::{RedisCache, RedisCacheConfig};
pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
