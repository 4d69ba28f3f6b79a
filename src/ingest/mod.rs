// src/ingest/mod.rs
pub mod config;
pub mod pipeline;
pub mod providers;
pub mod types;

use chrono::NaiveDateTime;
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

use crate::ingest::types::{Batch, NormalizedRecord, RawRecord, Window, PLACEHOLDER};
use crate::timeparse::TimeExpressionParser;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "crawl_records_extracted_total",
            "Records extracted from fetched result blocks."
        );
        describe_counter!(
            "crawl_records_dropped_total",
            "Records dropped for extraction or time parse failures."
        );
        describe_counter!(
            "crawl_records_kept_total",
            "Records inside the window after filtering."
        );
        describe_counter!("crawl_pages_failed_total", "Result pages that failed to load.");
        describe_counter!("cache_refresh_total", "Cache refresh attempts by outcome.");
        describe_gauge!("cache_batch_size", "Records in the currently served batch.");
        describe_gauge!(
            "cache_last_publish_ts",
            "Unix ts when the cache last published a batch."
        );
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Per-run counts reported by `filter_and_sort`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub unparsed: usize,
    pub outside_window: usize,
    pub kept: usize,
}

/// Resolve each record's time against `now`, keep those inside `window`,
/// and order the survivors most recent first.
///
/// A record whose time does not parse is dropped; a record missing only
/// optional text gets the placeholder for that text.
pub fn filter_and_sort(
    records: Vec<RawRecord>,
    parser: &TimeExpressionParser,
    now: NaiveDateTime,
    window: &Window,
) -> (Batch, FilterStats) {
    let mut stats = FilterStats::default();
    let mut kept = Vec::with_capacity(records.len());

    for r in records {
        let instant = match parser.parse(&r.raw_time, now) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(target: "ingest", error = %e, url = %r.url, "dropping record");
                stats.unparsed += 1;
                continue;
            }
        };
        if !window.contains(instant) {
            stats.outside_window += 1;
            continue;
        }
        let fill = |v: Option<String>| v.unwrap_or_else(|| PLACEHOLDER.to_string());
        kept.push(NormalizedRecord {
            company: fill(r.source),
            title: fill(r.title),
            excerpt: fill(r.excerpt),
            url: r.url,
            raw_time: r.raw_time,
            instant,
        });
    }

    stats.kept = kept.len();
    counter!("crawl_records_dropped_total").increment(stats.unparsed as u64);
    counter!("crawl_records_kept_total").increment(stats.kept as u64);

    (Batch::from_unsorted(kept), stats)
}
