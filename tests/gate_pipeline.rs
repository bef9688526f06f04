//! End-to-end tests of the request gate in front of the quote routes
//!
//! The full router runs over in-memory stores wrapped in counting fakes, so
//! tests can assert which stores a request touched.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anime_quotes_api::api::create_router;
use anime_quotes_api::build_app_state;
use anime_quotes_api::config::{AppConfig, PolicyConfig};
use anime_quotes_api::domain::api_key::{ApiKey, ApiKeyRepository};
use anime_quotes_api::domain::cache::{Cache, Counter};
use anime_quotes_api::domain::DomainError;
use anime_quotes_api::infrastructure::api_key::InMemoryApiKeyRepository;
use anime_quotes_api::infrastructure::cache::InMemoryCache;
use anime_quotes_api::infrastructure::quote::InMemoryQuoteRepository;
use anime_quotes_api::infrastructure::storage::Repositories;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;

mod fakes {
    use super::*;

    /// Wraps a real cache and counts every call
    #[derive(Debug)]
    pub struct CountingCache {
        inner: Option<InMemoryCache>,
        calls: AtomicUsize,
    }

    impl CountingCache {
        pub fn new() -> Self {
            Self {
                inner: Some(InMemoryCache::new()),
                calls: AtomicUsize::new(0),
            }
        }

        /// Every call fails as if the backend were unreachable
        pub fn unreachable() -> Self {
            Self {
                inner: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn inner(&self) -> Result<&InMemoryCache, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner
                .as_ref()
                .ok_or_else(|| DomainError::cache("connection refused"))
        }
    }

    #[async_trait]
    impl Cache for CountingCache {
        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.inner()?.get_raw(key).await
        }

        async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
            self.inner()?.set_raw(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.inner()?.delete(key).await
        }

        async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
            self.inner()?.ttl(key).await
        }

        async fn increment(
            &self,
            key: &str,
            delta: i64,
            ttl: Duration,
        ) -> Result<Counter, DomainError> {
            self.inner()?.increment(key, delta, ttl).await
        }

        async fn ping(&self) -> Result<(), DomainError> {
            self.inner()?.ping().await
        }
    }

    /// In-memory key store that counts lookups
    #[derive(Debug, Default)]
    pub struct CountingApiKeyRepository {
        inner: InMemoryApiKeyRepository,
        lookups: AtomicUsize,
    }

    impl CountingApiKeyRepository {
        pub fn with_keys(keys: impl IntoIterator<Item = ApiKey>) -> Self {
            Self {
                inner: InMemoryApiKeyRepository::with_keys(keys),
                lookups: AtomicUsize::new(0),
            }
        }

        pub fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ApiKeyRepository for CountingApiKeyRepository {
        async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>, DomainError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_key(key).await
        }

        async fn ping(&self) -> Result<(), DomainError> {
            self.inner.ping().await
        }
    }
}

use fakes::{CountingApiKeyRepository, CountingCache};

struct TestApp {
    router: Router,
    cache: Arc<CountingCache>,
    api_keys: Arc<CountingApiKeyRepository>,
}

fn known_key() -> String {
    format!("ani-{}", "k".repeat(56))
}

fn unknown_key() -> String {
    format!("ani-{}", "u".repeat(56))
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.rate_limit.ip = PolicyConfig {
        max_requests: 5,
        window_secs: 60,
    };
    config.rate_limit.api_key = PolicyConfig {
        max_requests: 3,
        window_secs: 60,
    };
    config
}

fn app_with(config: AppConfig, cache: CountingCache) -> TestApp {
    let cache = Arc::new(cache);
    let api_keys = Arc::new(CountingApiKeyRepository::with_keys([ApiKey::new(
        known_key(),
        "docs",
    )]));

    let repositories = Repositories {
        api_keys: api_keys.clone(),
        quotes: Arc::new(InMemoryQuoteRepository::with_sample_data()),
    };
    let state = build_app_state(&config, cache.clone(), repositories);

    TestApp {
        router: create_router(state, None),
        cache,
        api_keys,
    }
}

fn app() -> TestApp {
    app_with(test_config(), CountingCache::new())
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    async fn get(&self, path: &str, api_key: Option<&str>) -> TestResponse {
        self.get_from(path, api_key, "1.2.3.4:40000").await
    }

    async fn get_from(&self, path: &str, api_key: Option<&str>, peer: &str) -> TestResponse {
        let mut builder = Request::builder().uri(path);
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

#[tokio::test]
async fn test_unknown_path_is_rejected_without_store_access() {
    let app = app();

    let response = app.get("/admin", Some(&known_key())).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"message": "Endpoint not found"}));
    assert_eq!(app.cache.calls(), 0);
    assert_eq!(app.api_keys.lookups(), 0);
}

#[tokio::test]
async fn test_unknown_paths_share_one_metrics_series() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let _guard = metrics::set_default_local_recorder(&recorder);
    let app = app();

    for i in 0..20 {
        let response = app.get(&format!("/junk-{}x", i), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
    app.get("/quotes/998", Some(&known_key())).await;
    app.get("/quotes/999", Some(&known_key())).await;

    let rendered = handle.render();
    let series: Vec<&str> = rendered
        .lines()
        .filter(|line| line.starts_with("http_requests_total{"))
        .collect();

    assert_eq!(series.len(), 2, "{}", rendered);
    assert!(series.iter().any(|line| {
        line.contains(r#"path="unmatched""#) && line.contains(r#"status="404""#) && line.ends_with(" 20")
    }));
    assert!(series.iter().any(|line| line.contains(r#"path="/quotes/{id}""#)));
    assert!(!rendered.contains("junk"));
}

#[tokio::test]
async fn test_trailing_slash_is_not_a_route() {
    let app = app();

    let response = app.get("/quotes/random/", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"message": "Endpoint not found"}));
    assert_eq!(app.cache.calls(), 0);
}

#[tokio::test]
async fn test_non_numeric_id_is_not_a_route() {
    let app = app();

    let response = app.get("/quotes/abc", Some(&known_key())).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"message": "Endpoint not found"}));
}

#[tokio::test]
async fn test_protected_route_without_key() {
    let app = app();

    let response = app.get("/quotes/7", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body,
        json!({"message": "Unauthorized. Missing API key!"})
    );
    assert_eq!(app.cache.calls(), 0);
}

#[tokio::test]
async fn test_free_route_is_limited_per_ip() {
    let app = app();

    let mut statuses = Vec::new();
    for _ in 0..10 {
        statuses.push(app.get("/quotes/random", None).await.status);
    }

    assert_eq!(
        statuses,
        [vec![StatusCode::OK; 5], vec![StatusCode::TOO_MANY_REQUESTS; 5]].concat()
    );
    assert_eq!(app.api_keys.lookups(), 0);
}

#[tokio::test]
async fn test_quota_rejection_body_and_headers() {
    let app = app();
    for _ in 0..5 {
        app.get("/quotes/random", None).await;
    }

    let response = app.get("/quotes/random", None).await;

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.body,
        json!({"message": "Too many requests, please try again later."})
    );
    let retry_after: u64 = response.headers["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
}

#[tokio::test]
async fn test_ip_counters_are_independent() {
    let app = app();
    for _ in 0..5 {
        app.get_from("/quotes/random", None, "1.2.3.4:1").await;
    }

    let other = app.get_from("/quotes/random", None, "5.6.7.8:1").await;
    let same = app.get_from("/quotes/random", None, "1.2.3.4:2").await;

    assert_eq!(other.status, StatusCode::OK);
    assert_eq!(same.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_admitted_response_carries_quota_headers() {
    let app = app();

    let first = app.get("/quotes/random", None).await;
    let second = app.get("/quotes/random", None).await;

    assert_eq!(first.headers["x-ratelimit-limit"], "5");
    assert_eq!(first.headers["x-ratelimit-remaining"], "4");
    assert_eq!(second.headers["x-ratelimit-remaining"], "3");
}

#[tokio::test]
async fn test_malformed_key_touches_no_store() {
    let app = app();

    for key in ["abc", "ani-short", &format!("xyz-{}", "k".repeat(56))] {
        let response = app.get("/quotes/random", Some(key)).await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.body,
            json!({"message": "Unauthorized. Invalid API key!"})
        );
    }

    assert_eq!(app.cache.calls(), 0);
    assert_eq!(app.api_keys.lookups(), 0);
}

#[tokio::test]
async fn test_unknown_key_is_rejected() {
    let app = app();

    let response = app.get("/quotes/7", Some(&unknown_key())).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({"message": "Invalid API key"}));
    assert_eq!(app.api_keys.lookups(), 1);
}

#[tokio::test]
async fn test_valid_key_reads_formatted_quote() {
    let app = app();

    let response = app.get("/quotes/7", Some(&known_key())).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "anime": "Naruto",
            "character": "Naruto Uzumaki",
            "content": "Hard work is worthless for those that don't believe in themselves."
        })
    );
    assert_eq!(response.headers["x-ratelimit-limit"], "3");
}

#[tokio::test]
async fn test_validated_key_is_served_from_cache() {
    let app = app();

    for _ in 0..3 {
        let response = app.get("/quotes/7", Some(&known_key())).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    assert_eq!(app.api_keys.lookups(), 1);
}

#[tokio::test]
async fn test_cache_population_can_be_disabled() {
    let mut config = test_config();
    config.auth.populate_cache_on_lookup = false;
    let app = app_with(config, CountingCache::new());

    for _ in 0..3 {
        app.get("/quotes/7", Some(&known_key())).await;
    }

    assert_eq!(app.api_keys.lookups(), 3);
}

#[tokio::test]
async fn test_key_quota_is_separate_from_ip_quota() {
    let app = app();
    for _ in 0..5 {
        app.get("/quotes/random", None).await;
    }

    let mut statuses = Vec::new();
    for _ in 0..4 {
        statuses.push(app.get("/quotes/random", Some(&known_key())).await.status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn test_missing_quote_is_not_found() {
    let app = app();

    let response = app.get("/quotes/999", Some(&known_key())).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"message": "Quote not found"}));
}

#[tokio::test]
async fn test_random_by_anime_is_case_insensitive() {
    let app = app();

    let response = app
        .get("/quotes/random/anime?name=naruto", Some(&known_key()))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["anime"], "Naruto");
}

#[tokio::test]
async fn test_random_by_character() {
    let app = app();

    let response = app
        .get("/quotes/random/character?name=Spike%20Spiegel", Some(&known_key()))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "anime": "Cowboy Bebop",
            "character": "Spike Spiegel",
            "content": "Whatever happens, happens."
        })
    );
}

#[tokio::test]
async fn test_random_by_unknown_anime_is_not_found() {
    let app = app();

    let response = app
        .get("/quotes/random/anime?name=Bleach", Some(&known_key()))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"message": "Quote not found"}));
}

#[tokio::test]
async fn test_query_validation() {
    let app = app();

    let missing = app.get("/quotes/random/anime", Some(&known_key())).await;
    let bad_page = app.get("/quotes?page=0", Some(&known_key())).await;

    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_page.status, StatusCode::BAD_REQUEST);
    assert!(bad_page.body["message"].as_str().unwrap().contains("page"));
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let app = app();

    let naruto = app.get("/quotes?anime=Naruto", Some(&known_key())).await;
    let beyond = app.get("/quotes?page=2", Some(&known_key())).await;

    assert_eq!(naruto.status, StatusCode::OK);
    let quotes = naruto.body.as_array().unwrap();
    assert_eq!(quotes.len(), 4);
    assert!(quotes.iter().all(|q| q["anime"] == "Naruto"));

    assert_eq!(beyond.status, StatusCode::OK);
    assert_eq!(beyond.body, json!([]));
}

#[tokio::test]
async fn test_counter_store_outage_fails_closed() {
    let app = app_with(test_config(), CountingCache::unreachable());

    let response = app.get("/quotes/random", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.body,
        json!({"message": "Service temporarily unavailable"})
    );
}

#[tokio::test]
async fn test_counter_store_outage_can_fail_open() {
    let mut config = test_config();
    config.rate_limit.fail_open = true;
    let app = app_with(config, CountingCache::unreachable());

    let anonymous = app.get("/quotes/random", None).await;
    let keyed = app.get("/quotes/7", Some(&known_key())).await;

    assert_eq!(anonymous.status, StatusCode::OK);
    assert!(anonymous.headers.get("x-ratelimit-limit").is_none());
    assert_eq!(keyed.status, StatusCode::OK);
    assert_eq!(app.api_keys.lookups(), 1);
}

#[tokio::test]
async fn test_health_endpoints_bypass_the_gate() {
    let app = app_with(test_config(), CountingCache::unreachable());

    let health = app.get("/health", None).await;
    let ready = app.get("/ready", None).await;

    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");
    assert_eq!(ready.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready.body["status"], "unhealthy");
}

#[tokio::test]
async fn test_ready_when_stores_are_up() {
    let app = app();

    let ready = app.get("/ready", None).await;

    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["checks"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = app();

    let response = app.get("/health", None).await;

    assert!(response.headers.contains_key("x-request-id"));
}
