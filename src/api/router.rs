use axum::{
    http::{header::HeaderName, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::health;
use super::middleware::{
    logging_middleware, metrics_middleware, request_gate_middleware, API_KEY_HEADER,
};
use super::quotes;
use super::state::AppState;
use super::types::ApiError;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Quote routes and the 404 fallback sit behind the request gate; the
/// health and metrics endpoints do not.
pub fn create_router(state: AppState, metrics: Option<PrometheusMetrics>) -> Router {
    let gated = quotes::create_quotes_router()
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_gate_middleware,
        ));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .route("/ready", get(health::ready_check))
        .merge(gated)
        .with_state(state);

    if let Some(metrics) = metrics {
        router = router.merge(create_metrics_router(metrics));
    }

    let x_request_id = HeaderName::from_static("x-request-id");

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([HeaderName::from_static(API_KEY_HEADER)])
}

async fn endpoint_not_found() -> Response {
    ApiError::not_found("Endpoint not found").into_response()
}
