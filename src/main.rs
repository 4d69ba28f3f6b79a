//! Issue Monitor: binary entrypoint.
//! Boots the Axum HTTP server, starts the periodic crawl refresher, and serves
//! the cached result set.

use issue_monitor::api::{self, AppState};
use issue_monitor::ingest::config::load_config_default;
use issue_monitor::metrics::Metrics;
use issue_monitor::RefreshScheduler;
use shuttle_axum::ShuttleAxum;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact local logs, only when MONITOR_DEV_LOG=1. Under Shuttle the platform
/// owns the global subscriber, so this uses `try_init`.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("MONITOR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !dev_flag {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("issue_monitor=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = load_config_default()?;
    tracing::info!(
        query = %cfg.crawl.query,
        pages = cfg.crawl.page_count,
        days_back = cfg.crawl.days_back,
        interval_secs = cfg.refresh_interval_secs,
        "starting issue monitor"
    );

    let metrics = Metrics::init(cfg.refresh_interval_secs)?;

    let cache = issue_monitor::build_default_cache(&cfg);
    // Owned by the router state: when the server shuts down and drops the
    // router, the timer task is aborted.
    let scheduler = Arc::new(RefreshScheduler::spawn(cache.clone(), cfg.refresh_interval()));

    let state = AppState {
        cache,
        scheduler: Some(scheduler),
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
