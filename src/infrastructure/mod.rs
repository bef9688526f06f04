//! Infrastructure layer - store backends, the request gate and observability

pub mod api_key;
pub mod cache;
pub mod gate;
pub mod logging;
pub mod observability;
pub mod quote;
pub mod rate_limit;
pub mod storage;
pub mod timeout;
