// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /digest                 (cascade + request overrides, item-limit cap)
// - POST /digest/{provider}      (single provider, error -> status mapping)
// - POST /debug/providers

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use sports_digest_curator::api::{self, AppState};
use sports_digest_curator::config::{GenerationDefaults, MAX_ITEMS_LIMIT};
use sports_digest_curator::{
    ContentItem, ContentProvider, Curator, FetchOptions, Interest, ProviderError, ProviderKind,
    SourceType,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct Canned {
    kind: ProviderKind,
    result: Result<usize, ProviderError>,
}

#[async_trait]
impl ContentProvider for Canned {
    async fn fetch(
        &self,
        interests: &[Interest],
        _opts: &FetchOptions,
    ) -> Result<Vec<ContentItem>, ProviderError> {
        let n = self.result.clone()?;
        let topic = interests.first().map(|i| i.name.clone()).unwrap_or_default();
        Ok((0..n)
            .map(|i| {
                let mut it = ContentItem::new(
                    format!("{topic} story {i}"),
                    format!("https://{}.example.com/{i}", self.kind.as_str()),
                    SourceType::Article,
                    self.kind,
                );
                it.related_interest = Some(topic.clone());
                it
            })
            .collect())
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Primary fails upstream, secondary yields 5, no tertiary configured.
fn test_router() -> Router {
    let providers: Vec<Arc<dyn ContentProvider>> = vec![
        Arc::new(Canned {
            kind: ProviderKind::Primary,
            result: Err(ProviderError::Upstream("anthropic returned 401".into())),
        }),
        Arc::new(Canned {
            kind: ProviderKind::Secondary,
            result: Ok(5),
        }),
    ];
    let state = AppState::new(Arc::new(Curator::new(providers)), GenerationDefaults::default());
    api::router(state)
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

async fn read_json(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

fn warriors() -> Json {
    json!({ "interests": [ { "type": "team", "name": "Warriors", "metadata": { "league": "NBA" } } ] })
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn api_digest_falls_back_and_reports_attempts() {
    let resp = test_router()
        .oneshot(post_json("/digest", &warriors()))
        .await
        .expect("oneshot /digest");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["items"].as_array().map(Vec::len), Some(5));
    assert_eq!(v["providers_used"], json!(["secondary"]));
    assert_eq!(v["degraded"], json!(false));
    assert_eq!(v["interests_used"], json!(["Warriors"]));
    assert!(v.get("generated_at").is_some(), "missing 'generated_at'");

    let attempts = v["attempts"].as_array().expect("attempts array");
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["status"], "failed");
    assert_eq!(attempts[0]["kind"], "upstream");
    assert_eq!(attempts[1]["status"], "items");
    assert_eq!(attempts[1]["count"], 5);
}

#[tokio::test]
async fn api_digest_honours_request_limits() {
    let mut payload = warriors();
    payload["max_items"] = json!(2);
    payload["min_items"] = json!(4);

    let resp = test_router()
        .oneshot(post_json("/digest", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["items"].as_array().map(Vec::len), Some(2));
    // min_items is clamped to max_items, so two items are not degraded.
    assert_eq!(v["degraded"], json!(false));
}

/// Remembers the target each fetch was asked for.
struct TargetRecorder(Arc<parking_lot::Mutex<Vec<usize>>>);

#[async_trait]
impl ContentProvider for TargetRecorder {
    async fn fetch(
        &self,
        _interests: &[Interest],
        opts: &FetchOptions,
    ) -> Result<Vec<ContentItem>, ProviderError> {
        self.0.lock().push(opts.target_items);
        Ok(Vec::new())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn api_digest_caps_oversized_item_limits() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let providers: Vec<Arc<dyn ContentProvider>> = vec![Arc::new(TargetRecorder(seen.clone()))];
    let app = api::router(AppState::new(
        Arc::new(Curator::new(providers)),
        GenerationDefaults::default(),
    ));

    let mut payload = warriors();
    payload["max_items"] = json!(u64::MAX);
    payload["min_items"] = json!(u64::MAX);

    let resp = app.oneshot(post_json("/digest", &payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["degraded"], json!(true));
    assert_eq!(*seen.lock(), vec![MAX_ITEMS_LIMIT]);
}

#[tokio::test]
async fn api_digest_with_no_usable_interests_is_empty_and_degraded() {
    let resp = test_router()
        .oneshot(post_json("/digest", &json!({ "interests": [] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["items"], json!([]));
    assert_eq!(v["degraded"], json!(true));
}

#[tokio::test]
async fn api_digest_rejects_malformed_payloads() {
    let resp = test_router()
        .oneshot(post_json("/digest", &json!({ "interests": [ { "type": "league", "name": "NBA" } ] })))
        .await
        .unwrap();
    assert!(resp.status().is_client_error(), "got {}", resp.status());
}

#[tokio::test]
async fn api_single_provider_maps_errors_to_statuses() {
    let app = test_router();

    let ok = app
        .clone()
        .oneshot(post_json("/digest/perplexity", &warriors()))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(read_json(ok).await["providers_used"], json!(["secondary"]));

    let upstream = app
        .clone()
        .oneshot(post_json("/digest/primary", &warriors()))
        .await
        .unwrap();
    assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(read_json(upstream).await["kind"], "upstream");

    let missing = app
        .clone()
        .oneshot(post_json("/digest/tertiary", &warriors()))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(read_json(missing).await["kind"], "unavailable");

    let unknown = app
        .oneshot(post_json("/digest/twitter", &warriors()))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_debug_providers_lists_every_backend() {
    let resp = test_router()
        .oneshot(post_json("/debug/providers", &warriors()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["providers_available"], json!(["primary", "secondary"]));
    let results = v["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["success"], json!(false));
    assert_eq!(results[0]["error_kind"], "upstream");
    assert_eq!(results[1]["items_count"], 5);
    assert_eq!(v["recommendation"], "secondary");
}
