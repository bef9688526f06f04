//! Request gate middleware
//!
//! Runs the gate in front of the quote routes and their fallback. Admitted
//! requests carry the [`Admission`](crate::domain::gate::Admission) as a
//! request extension.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::gate::GateRequest;

pub const API_KEY_HEADER: &str = "x-api-key";

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

pub async fn request_gate_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let gate_request = GateRequest {
        path: request.uri().path().to_string(),
        api_key: extract_api_key(request.headers()),
        client_ip: client_ip(&request, state.trust_forwarded_for),
    };

    match state.gate.evaluate(gate_request).await {
        Ok(admission) => {
            let quota = admission.quota;
            request.extensions_mut().insert(admission);

            let mut response = next.run(request).await;

            if let Some(quota) = quota {
                let headers = response.headers_mut();
                headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(quota.limit));
                headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(quota.remaining));
            }

            response
        }
        Err(rejection) => ApiError::from(rejection).into_response(),
    }
}

/// An empty header counts as absent
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .filter(|key| !key.is_empty())
}

/// Peer address, or the first `X-Forwarded-For` entry when trusted.
/// `0.0.0.0` when neither is available.
fn client_ip(request: &Request<Body>, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
