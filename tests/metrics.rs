// tests/metrics.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use tower::ServiceExt;

use issue_monitor::api::{self, AppState};
use issue_monitor::clock::FixedClock;
use issue_monitor::ingest::config::MonitorConfig;
use issue_monitor::ingest::providers::fixture::FixtureFetcherFactory;
use issue_monitor::ingest::types::RawBlock;
use issue_monitor::metrics::Metrics;

// Installs the process-wide recorder, so this file holds a single test.
#[tokio::test]
async fn metrics_endpoint_contains_refresh_series() {
    let mut cfg = MonitorConfig::default();
    cfg.crawl.page_count = 2;
    cfg.crawl.page_backoff_ms = 0;
    let metrics = Metrics::init(cfg.refresh_interval_secs).expect("recorder");

    let fetcher = FixtureFetcherFactory::new()
        .page(
            0,
            vec![RawBlock::new(["연합뉴스", "a", "요약", "1시간 전"], Some("https://n.test/a"))],
        )
        .failing_page(10, "reset");
    let now = NaiveDate::from_ymd_opt(2024, 12, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let cache = issue_monitor::build_cache(&cfg, Arc::new(fetcher), Arc::new(FixedClock::new(now)));
    cache.refresh().await;

    let app = api::create_router(AppState::new(cache)).merge(metrics.router());
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    for series in [
        "cache_refresh_total",
        "cache_batch_size",
        "crawl_pages_failed_total",
        "crawl_records_kept_total",
        "cache_refresh_interval_secs",
    ] {
        assert!(text.contains(series), "missing {series} in:\n{text}");
    }
}
