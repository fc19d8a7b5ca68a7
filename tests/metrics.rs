// tests/metrics.rs
//
// Runs in its own process: the Prometheus recorder is global and can be installed once.

use std::sync::Arc;

use shuttle_axum::axum::body::{self, Body};
use shuttle_axum::axum::http::{Request, StatusCode};
use tower::ServiceExt;

use sports_digest_curator::config::GenerationDefaults;
use sports_digest_curator::curator::providers::EspnRssProvider;
use sports_digest_curator::metrics::Metrics;
use sports_digest_curator::{ContentProvider, Curator, GenerationConfig, Interest};

const GENERAL_XML: &str = include_str!("fixtures/espn_general.xml");
const NBA_XML: &str = include_str!("fixtures/espn_nba.xml");

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let metrics = Metrics::init(&GenerationDefaults::default()).expect("install recorder");

    let feed: Arc<dyn ContentProvider> =
        Arc::new(EspnRssProvider::from_fixtures([("general", GENERAL_XML), ("nba", NBA_XML)]));
    let curator = Curator::new(vec![feed]);
    curator
        .generate(&[Interest::team("Warriors")], &GenerationConfig::default())
        .await
        .expect("digest");

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "curator_min_items",
        "curator_max_items",
        "curator_provider_attempts_total",
        "curator_digests_total",
        "curator_provider_fetch_ms",
        "curator_feed_parse_ms",
    ] {
        assert!(text.contains(needle), "expected metric series '{needle}' in /metrics output");
    }
}
