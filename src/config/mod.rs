//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, PolicyConfig, RateLimitConfig, ServerConfig, StoreConfig,
};
pub use crate::infrastructure::logging::{LogFormat, LoggingConfig};
