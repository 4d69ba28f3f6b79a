// tests/ingest_pipeline.rs
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use issue_monitor::clock::FixedClock;
use issue_monitor::ingest::config::CrawlConfig;
use issue_monitor::ingest::providers::fixture::FixtureFetcherFactory;
use issue_monitor::ingest::types::RawBlock;
use issue_monitor::CrawlPipeline;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn block(company: &str, title: &str, time: &str) -> RawBlock {
    RawBlock::new(
        [company, title, "기사 요약", time],
        Some(format!("https://news.test/{title}").as_str()),
    )
}

fn cfg(pages: u32, days_back: u32) -> CrawlConfig {
    CrawlConfig {
        query: "추락".into(),
        page_count: pages,
        page_step: 10,
        days_back,
        page_backoff_ms: 0,
    }
}

#[tokio::test]
async fn transient_error_on_first_page_keeps_six_records() {
    let f = FixtureFetcherFactory::new()
        .failing_page(0, "net::ERR_CONNECTION_RESET")
        .page(
            10,
            vec![
                block("연합뉴스", "p2-a", "10분 전"),
                block("KBS", "p2-b", "2시간 전"),
                block("MBC", "p2-c", "45분 전"),
            ],
        )
        .page(
            20,
            vec![
                block("SBS", "p3-a", "1시간 전"),
                block("YTN", "p3-b", "5시간 전"),
                block("JTBC", "p3-c", "1분 전"),
            ],
        );

    let p = CrawlPipeline::new(Arc::new(f.clone()), cfg(3, 0), Arc::new(FixedClock::new(now())));
    let report = p.run().await;

    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.batch.len(), 6);
    let titles: Vec<_> = report.batch.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["p3-c", "p2-a", "p2-c", "p3-a", "p2-b", "p3-b"]);
    for pair in report.batch.records().windows(2) {
        assert!(pair[0].instant >= pair[1].instant);
    }
    assert_eq!(f.stats().released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hours_ago_kept_weeks_ago_dropped_in_today_window() {
    let f = FixtureFetcherFactory::new().page(
        0,
        vec![
            block("연합뉴스", "six-hours", "6시간 전"),
            block("연합뉴스", "two-weeks", "2주 전"),
        ],
    );
    let p = CrawlPipeline::new(Arc::new(f), cfg(1, 0), Arc::new(FixedClock::new(now())));
    let report = p.run().await;

    assert_eq!(report.batch.len(), 1);
    let kept = &report.batch.records()[0];
    assert_eq!(kept.title, "six-hours");
    assert_eq!(
        kept.instant,
        NaiveDate::from_ymd_opt(2024, 12, 1)
            .unwrap()
            .and_hms_opt(4, 0, 0)
            .unwrap()
    );
    assert_eq!(report.filter.outside_window, 1);
}

#[tokio::test]
async fn days_back_widens_window() {
    let f = FixtureFetcherFactory::new().page(
        0,
        vec![
            block("a", "two-weeks", "2주 전"),
            block("a", "absolute", "2024. 11. 28."),
            block("a", "old", "1개월 전"),
        ],
    );
    let p = CrawlPipeline::new(Arc::new(f), cfg(1, 14), Arc::new(FixedClock::new(now())));
    let report = p.run().await;

    let titles: Vec<_> = report.batch.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["absolute", "two-weeks"]);
    assert_eq!(report.batch.records()[1].instant, now() - Duration::days(14));
}

#[tokio::test]
async fn one_clock_read_anchors_the_whole_run() {
    let clock = Arc::new(FixedClock::new(now()));
    let f = FixtureFetcherFactory::new()
        .page(0, vec![block("a", "first", "1시간 전")])
        .page(10, vec![block("a", "second", "1시간 전")]);
    let p = CrawlPipeline::new(Arc::new(f), cfg(2, 0), clock.clone());
    let report = p.run().await;
    // Moving the clock afterwards does not affect a finished report.
    clock.set(now() + Duration::hours(3));
    assert_eq!(report.now, Some(now()));
    assert!(report
        .batch
        .iter()
        .all(|r| r.instant == now() - Duration::hours(1)));
}
