// src/ingest/pipeline.rs
//! One crawl run: acquire a fetcher, walk the configured result pages,
//! extract records, then filter and sort them into a batch.
//!
//! Failures are contained at the smallest unit that can absorb them: a record
//! that will not extract is skipped, a page that will not load is skipped
//! after a backoff, and a fetcher that cannot be acquired yields an empty
//! batch. The run itself never returns an error.

use std::sync::Arc;

use chrono::NaiveDateTime;
use metrics::counter;

use crate::clock::Clock;
use crate::ingest::config::CrawlConfig;
use crate::ingest::types::{Batch, FetcherFactory, PageFetcher, RawRecord, Window};
use crate::ingest::{ensure_metrics_described, filter_and_sort, FilterStats};
use crate::timeparse::TimeExpressionParser;

/// Outcome of one run: the batch plus what happened along the way.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub batch: Batch,
    pub now: Option<NaiveDateTime>,
    pub fetcher_unavailable: bool,
    pub pages_ok: usize,
    pub pages_failed: usize,
    pub extraction_failures: usize,
    pub filter: FilterStats,
}

impl CrawlReport {
    /// Nothing could be fetched at all: no fetcher, or every page failed.
    pub fn is_degraded(&self) -> bool {
        self.fetcher_unavailable || (self.pages_ok == 0 && self.pages_failed > 0)
    }
}

pub struct CrawlPipeline {
    factory: Arc<dyn FetcherFactory>,
    config: CrawlConfig,
    clock: Arc<dyn Clock>,
    parser: &'static TimeExpressionParser,
}

impl CrawlPipeline {
    pub fn new(factory: Arc<dyn FetcherFactory>, config: CrawlConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory,
            config,
            clock,
            parser: TimeExpressionParser::korean(),
        }
    }

    /// Run once, anchoring every relative time to a single read of the clock.
    pub async fn run(&self) -> CrawlReport {
        self.run_at(self.clock.now()).await
    }

    pub async fn run_at(&self, now: NaiveDateTime) -> CrawlReport {
        ensure_metrics_described();
        let window = Window::days_back(now, self.config.days_back);
        let mut report = CrawlReport {
            now: Some(now),
            ..CrawlReport::default()
        };

        let fetcher = match self.factory.acquire().await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = %e,
                    fetcher = self.factory.name(),
                    "fetcher unavailable, run yields empty batch"
                );
                report.fetcher_unavailable = true;
                return report;
            }
        };

        let mut lease = FetcherLease::new(fetcher);
        let records = self.collect_pages(lease.fetcher(), &mut report).await;
        lease.release().await;

        let (batch, stats) = filter_and_sort(records, self.parser, now, &window);
        report.batch = batch;
        report.filter = stats;

        tracing::info!(
            target: "ingest",
            query = %self.config.query,
            pages_ok = report.pages_ok,
            pages_failed = report.pages_failed,
            skipped = report.extraction_failures,
            unparsed = stats.unparsed,
            outside_window = stats.outside_window,
            kept = stats.kept,
            "crawl run finished"
        );
        report
    }

    /// Fetch every configured page. Never fails; a panicking fetcher is still
    /// released by its lease.
    async fn collect_pages(&self, fetcher: &mut dyn PageFetcher, report: &mut CrawlReport) -> Vec<RawRecord> {
        let mut records = Vec::new();
        for (page, offset) in self.config.offsets().enumerate() {
            let blocks = match fetcher.fetch_page(&self.config.query, offset).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(target: "ingest", page, offset, error = %e, "page fetch failed");
                    counter!("crawl_pages_failed_total").increment(1);
                    report.pages_failed += 1;
                    let backoff = self.config.page_backoff();
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    continue;
                }
            };
            report.pages_ok += 1;

            for block in &blocks {
                match RawRecord::try_from(block) {
                    Ok(r) => records.push(r),
                    Err(e) => {
                        tracing::debug!(target: "ingest", page, offset, error = %e, "skipping block");
                        report.extraction_failures += 1;
                    }
                }
            }
        }
        counter!("crawl_records_extracted_total").increment(records.len() as u64);
        counter!("crawl_records_dropped_total").increment(report.extraction_failures as u64);
        records
    }
}

/// Owns an acquired fetcher until it is released. If the run unwinds or is
/// cancelled before `release`, the drop hands the fetcher to a background
/// task that releases it.
struct FetcherLease {
    fetcher: Option<Box<dyn PageFetcher>>,
}

impl FetcherLease {
    fn new(fetcher: Box<dyn PageFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
        }
    }

    fn fetcher(&mut self) -> &mut dyn PageFetcher {
        match self.fetcher.as_deref_mut() {
            Some(f) => f,
            None => unreachable!("fetcher used after release"),
        }
    }

    async fn release(mut self) {
        if let Some(mut f) = self.fetcher.take() {
            f.release().await;
        }
    }
}

impl Drop for FetcherLease {
    fn drop(&mut self) {
        let Some(mut f) = self.fetcher.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(target: "ingest", "crawl run aborted, releasing fetcher in background");
                handle.spawn(async move { f.release().await });
            }
            Err(_) => {
                tracing::error!(target: "ingest", "crawl run aborted outside a runtime, fetcher not released");
            }
        }
    }
}
