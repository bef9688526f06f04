//! Prometheus metrics

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("numeric segment pattern is valid"));

const MAX_PATH_LABEL_LEN: usize = 50;

/// Handle used to render the `/metrics` body
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
    path: String,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Installs the global Prometheus recorder; `None` when disabled or already installed
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = match latency_histogram(PrometheusBuilder::new(), &config.latency_buckets) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid latency buckets, metrics disabled");
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            gauge!("anime_quotes_api_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
                path: config.path.clone(),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Prometheus metrics");
            None
        }
    }
}

fn latency_histogram(
    builder: PrometheusBuilder,
    buckets: &[f64],
) -> Result<PrometheusBuilder, BuildError> {
    if buckets.is_empty() {
        return Ok(builder);
    }

    builder.set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        buckets,
    )
}

pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    let path = metrics.path().to_string();

    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// One sample per stage the gate ran
pub fn record_gate_decision(stage: &'static str, outcome: &'static str) {
    counter!("gate_decisions_total", "stage" => stage, "outcome" => outcome).increment(1);
}

pub fn record_rate_limit_rejection(policy: &'static str) {
    counter!("rate_limit_rejections_total", "policy" => policy).increment(1);
}

/// `store` is `cache` or `database`
pub fn record_store_error(store: &'static str) {
    counter!("store_errors_total", "store" => store).increment(1);
}

/// Collapses numeric ids so `/quotes/7` and `/quotes/8` share a label
pub(crate) fn sanitize_path(path: &str) -> String {
    let path = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");

    path.chars().take(MAX_PATH_LABEL_LEN).collect()
}
