// src/lib.rs
// Public library surface for the service binary, the CLI, and integration tests.

pub mod api;
pub mod cache;
pub mod clock;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod timeparse;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::cache::{RefreshScheduler, RefreshingCache};
pub use crate::ingest::pipeline::CrawlPipeline;
pub use crate::ingest::types::{Batch, NormalizedRecord, Window};

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::ingest::config::MonitorConfig;
use crate::ingest::types::FetcherFactory;

/// Fetcher used by the binaries: live search pages when `ingest-http` is
/// enabled, an empty fixture otherwise.
#[cfg(feature = "ingest-http")]
pub fn default_fetcher() -> Arc<dyn FetcherFactory> {
    Arc::new(ingest::providers::google_news::GoogleNewsFetcherFactory::new())
}

#[cfg(not(feature = "ingest-http"))]
pub fn default_fetcher() -> Arc<dyn FetcherFactory> {
    Arc::new(ingest::providers::fixture::FixtureFetcherFactory::new())
}

/// Wire pipeline and cache for `cfg`. The caller owns scheduling.
pub fn build_cache(
    cfg: &MonitorConfig,
    fetcher: Arc<dyn FetcherFactory>,
    clock: Arc<dyn Clock>,
) -> Arc<RefreshingCache> {
    let pipeline = CrawlPipeline::new(fetcher, cfg.crawl.clone(), clock.clone());
    Arc::new(RefreshingCache::new(Arc::new(pipeline), clock))
}

/// Same as `build_cache` with the live fetcher and system clock.
pub fn build_default_cache(cfg: &MonitorConfig) -> Arc<RefreshingCache> {
    build_cache(cfg, default_fetcher(), Arc::new(SystemClock))
}
