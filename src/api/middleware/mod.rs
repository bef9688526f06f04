//! API middleware

pub mod gate;
pub mod logging;
pub mod metrics;

pub use gate::{request_gate_middleware, API_KEY_HEADER};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
