//! Observability: tracing, OpenTelemetry export and Prometheus metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_gate_decision, record_http_request,
    record_rate_limit_rejection, record_store_error, PrometheusMetrics,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
