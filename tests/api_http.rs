// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /  before the first refresh (empty list, no timestamp header)
// - GET /  after a refresh (row shape, ordering, instant format)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use tower::ServiceExt as _; // for `oneshot`

use issue_monitor::api::{self, AppState, IssueRow, PRODUCED_AT_HEADER};
use issue_monitor::clock::FixedClock;
use issue_monitor::ingest::config::MonitorConfig;
use issue_monitor::ingest::providers::fixture::FixtureFetcherFactory;
use issue_monitor::ingest::types::{RawBlock, PLACEHOLDER};
use issue_monitor::{build_cache, RefreshingCache};

const BODY_LIMIT: usize = 1024 * 1024;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn cache() -> Arc<RefreshingCache> {
    let fetcher = FixtureFetcherFactory::new().page(
        0,
        vec![
            RawBlock::new(["연합뉴스", "older", "요약", "6시간 전"], Some("https://n.test/older")),
            RawBlock::new(["KBS", "newer", "요약", "15분 전"], Some("https://n.test/newer")),
            RawBlock::new(["1시간 전"], Some("https://n.test/bare")),
        ],
    );
    let mut cfg = MonitorConfig::default();
    cfg.crawl.page_count = 1;
    cfg.crawl.page_backoff_ms = 0;
    build_cache(&cfg, Arc::new(fetcher), Arc::new(FixedClock::new(now())))
}

fn router(cache: Arc<RefreshingCache>) -> Router {
    api::create_router(AppState::new(cache))
}

async fn get(app: Router, uri: &str) -> (StatusCode, http::HeaderMap, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, headers, bytes)
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, _, body) = get(router(cache()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap().trim(), "OK");
}

#[tokio::test]
async fn list_before_first_refresh_is_empty() {
    let (status, headers, body) = get(router(cache()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(PRODUCED_AT_HEADER).is_none());
    let rows: Vec<IssueRow> = serde_json::from_slice(&body).expect("json");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn list_after_refresh_serves_sorted_rows() {
    let c = cache();
    c.refresh().await;

    let (status, headers, body) = get(router(c), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(PRODUCED_AT_HEADER).unwrap().to_str().unwrap(),
        "2024-12-01 10:00:00"
    );

    let rows: Vec<IssueRow> = serde_json::from_slice(&body).expect("json");
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        IssueRow {
            company: "KBS".into(),
            title: "newer".into(),
            excerpt: "요약".into(),
            url: "https://n.test/newer".into(),
            instant: "2024-12-01 09:45".into(),
        }
    );
    // Single-field block: the field doubles as source and time; the rest is filled in.
    assert_eq!(rows[1].instant, "2024-12-01 09:00");
    assert_eq!(rows[1].title, PLACEHOLDER);
    assert_eq!(rows[1].excerpt, PLACEHOLDER);
    assert_eq!(rows[2].title, "older");
    assert_eq!(rows[2].instant, "2024-12-01 04:00");
}
