//! Per-request HTTP metrics

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};

use crate::infrastructure::observability::record_http_request;

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = extract_path(&request);

    let response = next.run(request).await;

    record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

/// Label for requests that reached the fallback
pub(crate) const UNMATCHED_PATH: &str = "unmatched";

/// Route template when matched; every unrouted path shares one label
pub(crate) fn extract_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_string(), |mp| mp.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_path_without_route_is_unmatched() {
        for uri in ["/quotes/7?x=1", "/admin", "/junk-1x"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();

            assert_eq!(extract_path(&request), UNMATCHED_PATH);
        }
    }
}
