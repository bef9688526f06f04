//! Health endpoints for container probes; these sit outside the request gate

use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::state::AppState;
use crate::domain::DomainError;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            Self::Healthy => StatusCode::OK,
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Result of pinging one backing store
#[derive(Debug, Serialize)]
pub struct StoreProbe {
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<StoreProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            version: env!("CARGO_PKG_VERSION"),
            checks: Vec::new(),
            latency_ms: None,
        }
    }

    /// Unhealthy as soon as one probe failed
    fn from_probes(checks: Vec<StoreProbe>, started: Instant) -> Self {
        let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        Self {
            status,
            checks,
            latency_ms: Some(elapsed_ms(started)),
            ..Self::healthy()
        }
    }
}

/// Static: 200 while the process serves requests
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Pings the counter store and both durable stores, each under the store timeout
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let timeout = state.store_timeout;

    let (counter_store, api_keys, quotes) = tokio::join!(
        probe("counter_store", timeout.run("cache ping", state.cache.ping())),
        probe("api_keys", timeout.run("api key store ping", state.api_keys.ping())),
        probe("quotes", timeout.run("quote store ping", state.quote_service.ping())),
    );

    let response = HealthResponse::from_probes(vec![counter_store, api_keys, quotes], started);

    (response.status.status_code(), Json(response))
}

async fn probe<F>(name: &'static str, ping: F) -> StoreProbe
where
    F: Future<Output = Result<(), DomainError>>,
{
    let started = Instant::now();
    let result = ping.await;
    let latency_ms = elapsed_ms(started);

    if let Err(e) = &result {
        tracing::warn!(check = name, error = %e, "Readiness check failed");
    }

    StoreProbe {
        name,
        status: match result {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        },
        message: result.err().map(|e| e.to_string()),
        latency_ms,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
