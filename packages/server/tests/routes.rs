//! Router tests over mock upstreams and an in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use listing_server::server::{build_app, AppState};
use listing_server::sites::{bmw_stock, build_sources, BmwPremiumSelection, PorscheFinder};
use listing_server::Config;
use listing_sync::{page_url, ListingSite, MemoryStore, MockTransport};

fn app(transport: &MockTransport, store: Arc<MemoryStore>) -> Router {
    let config = Config::default();
    let sources = build_sources(&config, Arc::new(transport.clone()), store);
    build_app(AppState::new(sources))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let origin = response
        .headers()
        .get("x-snapshot-origin")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, origin, body)
}

fn stock_url(offset: usize) -> String {
    page_url(bmw_stock::ENDPOINT, "startIndex", offset).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = get(app(&MockTransport::new(), Arc::new(MemoryStore::new())), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "sources": 4 }));
}

#[tokio::test]
async fn test_sources_listing() {
    let (status, _, body) = get(app(&MockTransport::new(), Arc::new(MemoryStore::new())), "/api/sources").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0], json!({ "key": "i4/new", "ttlSeconds": 3600 }));
    assert_eq!(body[3], json!({ "key": "taycan/used", "ttlSeconds": 0 }));
}

#[tokio::test]
async fn test_unknown_source_is_404() {
    let (status, _, body) = get(app(&MockTransport::new(), Arc::new(MemoryStore::new())), "/api/x5/new").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("unknown source `x5/new`"));
}

#[tokio::test]
async fn test_stock_source_crawls_then_serves_cache() {
    let transport = MockTransport::new().with_json(
        stock_url(0),
        json!({
            "metadata": { "totalCount": 1 },
            "hits": [{ "vehicle": { "vssId": "WBA1" } }]
        }),
    );
    let store = Arc::new(MemoryStore::new());

    let (status, origin, body) = get(app(&transport, store.clone()), "/api/i5/new").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(origin.as_deref(), Some("refreshed"));
    assert_eq!(body["data"][0]["status"], json!("available"));
    assert!(body["retrievedAt"].is_i64());
    assert!(store.document("i5/new").is_some());

    let (_, origin, cached) = get(app(&transport, store), "/api/i5/new").await;
    assert_eq!(origin.as_deref(), Some("cached"));
    assert_eq!(cached, body);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_stock_upstream_failure_is_502() {
    let transport = MockTransport::new().with_failure(stock_url(0));

    let (status, _, body) = get(app(&transport, Arc::new(MemoryStore::new())), "/api/i4/new").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_premium_selection_crawl() {
    let site = BmwPremiumSelection::default();
    let car = "https://bmwpremiumselection.be/nl/voertuig/i5-1.html";
    let transport = MockTransport::new()
        .with_session_page(site.search_url(), "1", "PHPSESSID=abc")
        .with_page(
            site.listing_page_url(1),
            r#"<div class="car-content car-bps"><div class="car-body"><a href="/nl/voertuig/i5-1.html">i5</a></div></div>"#,
        )
        .with_page(car, "<html><body><div id=\"tab-options\"></div></body></html>");
    let store = Arc::new(MemoryStore::new());

    let (status, origin, body) = get(app(&transport, store.clone()), "/api/i5/used").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(origin.as_deref(), Some("refreshed"));
    assert_eq!(body, json!([{
        "title": null, "price": null, "km": null, "power": null,
        "dealer": null, "link": car, "options": []
    }]));
    assert_eq!(store.document("i5/used-links").unwrap()["links"], json!([car]));
    assert_eq!(
        transport.calls_to(&site.listing_page_url(1))[0]
            .session
            .as_ref()
            .map(|s| s.as_str().to_string()),
        Some("PHPSESSID=abc".to_string())
    );
}

#[tokio::test]
async fn test_premium_selection_without_session_degrades_to_empty() {
    let site = BmwPremiumSelection::default();
    let transport = MockTransport::new().with_page(site.search_url(), "40");
    let store = Arc::new(MemoryStore::new());

    let (status, origin, body) = get(app(&transport, store.clone()), "/api/i5/used").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(origin.as_deref(), Some("degraded"));
    assert_eq!(body, json!([]));
    assert!(store.document("i5/used").is_none());
}

#[tokio::test]
async fn test_taycan_failed_pages_are_skipped() {
    // only the search page answers; pages 2..=11 are unregistered (404)
    let site = PorscheFinder::default();
    let car = "https://finder.porsche.com/be/nl-BE/details/taycan-1";
    let transport = MockTransport::new()
        .with_page(
            site.search_url(),
            r#"<main><div><div><section><article><div><a href="/be/nl-BE/details/taycan-1">x</a></div></article></section></div></div></main>"#,
        )
        .with_page(car, "<main><header><h1>Taycan</h1></header></main>");
    let store = Arc::new(MemoryStore::new());

    let (status, origin, body) = get(app(&transport, store.clone()), "/api/taycan/used").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(origin.as_deref(), Some("degraded"));
    assert_eq!(body[0]["title"], json!("Taycan"));
    assert_eq!(body[0]["link"], json!(car));
    let stored = store.document("taycan/used").unwrap();
    assert!(stored["timestamp"].as_i64().unwrap() <= Utc::now().timestamp_millis());
}
