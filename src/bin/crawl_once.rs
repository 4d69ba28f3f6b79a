//! Run a single crawl with the configured query and print what it kept.
//!
//! Usage: `crawl_once [--json]`

use std::sync::Arc;

use issue_monitor::api::IssueRow;
use issue_monitor::clock::SystemClock;
use issue_monitor::ingest::config::load_config_default;
use issue_monitor::CrawlPipeline;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("issue_monitor=info,warn")),
        )
        .init();

    let as_json = std::env::args().skip(1).any(|a| a == "--json");
    let cfg = load_config_default()?;

    let pipeline = CrawlPipeline::new(issue_monitor::default_fetcher(), cfg.crawl.clone(), Arc::new(SystemClock));
    let report = pipeline.run().await;

    let rows: Vec<IssueRow> = report.batch.iter().map(IssueRow::from).collect();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for r in &rows {
            println!("{} | {} | {} | {}", r.instant, r.company, r.title, r.url);
        }
        println!(
            "query={} kept={} pages_ok={} pages_failed={}",
            cfg.crawl.query,
            rows.len(),
            report.pages_ok,
            report.pages_failed
        );
    }
    Ok(())
}
