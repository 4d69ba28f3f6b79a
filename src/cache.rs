// src/cache.rs
//! Refreshing result cache.
//!
//! A single refresher replaces the published entry wholesale; readers take a
//! cheap clone of whatever entry is current and never wait on a crawl. A
//! refresh that fails leaves the current entry in place.
//!
//! At most one refresh runs at a time. A tick that arrives while a refresh is
//! in flight is dropped instead of queued.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use metrics::{counter, gauge};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::ingest::ensure_metrics_described;
use crate::ingest::pipeline::CrawlPipeline;
use crate::ingest::types::Batch;

/// Produces the next batch for the cache.
#[async_trait::async_trait]
pub trait BatchProducer: Send + Sync {
    async fn produce(&self) -> Result<Batch>;
}

#[async_trait::async_trait]
impl BatchProducer for CrawlPipeline {
    async fn produce(&self) -> Result<Batch> {
        let report = self.run().await;
        if report.fetcher_unavailable {
            bail!("fetcher unavailable");
        }
        if report.is_degraded() {
            bail!("all {} result pages failed", report.pages_failed);
        }
        Ok(report.batch)
    }
}

/// One published generation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub batch: Batch,
    pub produced_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published { records: usize },
    Failed,
    /// Another refresh was already running.
    Skipped,
}

impl RefreshOutcome {
    fn label(self) -> &'static str {
        match self {
            RefreshOutcome::Published { .. } => "published",
            RefreshOutcome::Failed => "failed",
            RefreshOutcome::Skipped => "skipped",
        }
    }
}

pub struct RefreshingCache {
    producer: Arc<dyn BatchProducer>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<CacheEntry>>>,
    refreshing: Mutex<()>,
}

impl RefreshingCache {
    pub fn new(producer: Arc<dyn BatchProducer>, clock: Arc<dyn Clock>) -> Self {
        ensure_metrics_described();
        Self {
            producer,
            clock,
            current: RwLock::new(None),
            refreshing: Mutex::new(()),
        }
    }

    /// Current batch; empty until the first successful refresh.
    pub fn get(&self) -> Batch {
        self.entry().map(|e| e.batch.clone()).unwrap_or_default()
    }

    /// Current entry with its production time, if any was published.
    pub fn entry(&self) -> Option<Arc<CacheEntry>> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Run the producer once and publish on success.
    pub async fn refresh(&self) -> RefreshOutcome {
        let outcome = match self.refreshing.try_lock() {
            Ok(_guard) => self.refresh_locked().await,
            Err(_) => {
                tracing::debug!(target: "cache", "refresh already running, skipping tick");
                RefreshOutcome::Skipped
            }
        };
        counter!("cache_refresh_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn refresh_locked(&self) -> RefreshOutcome {
        match self.producer.produce().await {
            Ok(batch) => {
                let records = batch.len();
                let produced_at = self.clock.now();
                self.publish(CacheEntry { batch, produced_at });
                tracing::info!(target: "cache", records, %produced_at, "published new batch");
                RefreshOutcome::Published { records }
            }
            Err(e) => {
                tracing::warn!(target: "cache", error = ?e, "refresh failed, keeping previous batch");
                RefreshOutcome::Failed
            }
        }
    }

    fn publish(&self, entry: CacheEntry) {
        gauge!("cache_batch_size").set(entry.batch.len() as f64);
        gauge!("cache_last_publish_ts").set(entry.produced_at.and_utc().timestamp() as f64);
        let entry = Arc::new(entry);
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = Some(entry);
    }
}

/// Shortest interval the scheduler will tick at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic refresher. Dropping it (or calling `shutdown`) stops the timer.
pub struct RefreshScheduler {
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Tick immediately, then every `interval`. Each tick spawns its own
    /// refresh, so a slow crawl overrunning the interval makes the next tick
    /// a no-op rather than delaying the timer. Intervals below
    /// `MIN_REFRESH_INTERVAL` are raised to it.
    pub fn spawn(cache: Arc<RefreshingCache>, interval: Duration) -> Self {
        let interval = if interval < MIN_REFRESH_INTERVAL {
            tracing::warn!(
                target: "cache",
                requested_ms = interval.as_millis() as u64,
                "refresh interval too short, using minimum"
            );
            MIN_REFRESH_INTERVAL
        } else {
            interval
        };
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.refresh().await;
                });
            }
        });
        Self { handle }
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
