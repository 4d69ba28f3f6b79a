// src/ingest/types.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{ExtractionFailure, FetchError};

/// Value used for text fields the result block did not carry.
pub const PLACEHOLDER: &str = "Unknown";

/// One result block as handed over by a page fetcher: the block's text
/// sub-fields in document order plus its link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    pub fields: Vec<String>,
    pub link: Option<String>,
}

impl RawBlock {
    pub fn new<I, S>(fields: I, link: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            link: link.map(str::to_string),
        }
    }
}

/// A block split into named fields. Positional convention of the listing:
/// source, title, excerpt, ..., time (always the last field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub source: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub raw_time: String,
    pub url: String,
}

impl TryFrom<&RawBlock> for RawRecord {
    type Error = ExtractionFailure;

    fn try_from(block: &RawBlock) -> Result<Self, Self::Error> {
        let url = block
            .link
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ExtractionFailure::MissingLink)?;
        let raw_time = block.fields.last().ok_or(ExtractionFailure::NoFields)?;

        let text_at = |i: usize| {
            block
                .fields
                .get(i)
                .map(|s| super::normalize_text(s))
                .filter(|s| !s.is_empty())
        };

        Ok(RawRecord {
            source: text_at(0),
            title: text_at(1),
            excerpt: text_at(2),
            raw_time: raw_time.clone(),
            url: url.to_string(),
        })
    }
}

/// A record whose time resolved to an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub company: String,
    pub title: String,
    pub excerpt: String,
    pub url: String,
    pub raw_time: String,
    pub instant: NaiveDateTime,
}

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Window {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Window ending at `now`. `days_back == 0` starts at local midnight of
    /// `now`'s date; otherwise it starts `days_back` days before `now`.
    pub fn days_back(now: NaiveDateTime, days_back: u32) -> Self {
        let start = if days_back == 0 {
            now.date().and_time(NaiveTime::MIN)
        } else {
            now.checked_sub_signed(Duration::days(i64::from(days_back)))
                .unwrap_or(NaiveDateTime::MIN)
        };
        Self { start, end: now }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Immutable, time-descending result set of one crawl run. Cloning shares
/// the underlying records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    records: Arc<[NormalizedRecord]>,
}

impl Default for Batch {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
        }
    }
}

impl Batch {
    /// Sorts by instant, most recent first. Equal instants keep input order.
    pub fn from_unsorted(mut records: Vec<NormalizedRecord>) -> Self {
        records.sort_by(|a, b| b.instant.cmp(&a.instant));
        Self {
            records: records.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when both handles share the same published records.
    pub fn same_generation(&self, other: &Batch) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

/// Source of result pages. One instance serves one crawl run; pages are
/// fetched sequentially through `&mut self`.
#[async_trait::async_trait]
pub trait PageFetcher: Send {
    async fn fetch_page(&mut self, query: &str, offset: u32) -> Result<Vec<RawBlock>, FetchError>;

    /// Release whatever external resource backs this fetcher. Called exactly
    /// once at the end of every run that acquired it.
    async fn release(&mut self);
}

/// Acquires a fresh `PageFetcher` per run.
#[async_trait::async_trait]
pub trait FetcherFactory: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn PageFetcher>, FetchError>;
    fn name(&self) -> &'static str;
}
