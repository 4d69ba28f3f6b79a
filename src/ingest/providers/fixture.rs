// src/ingest/providers/fixture.rs
//! Scripted fetcher: serves pre-recorded pages keyed by offset.
//!
//! Offsets without a script return an empty page. Every acquire and release
//! is counted so callers can check that runs clean up after themselves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::ingest::types::{FetcherFactory, PageFetcher, RawBlock};

#[derive(Debug, Clone)]
enum Page {
    Blocks(Vec<RawBlock>),
    Transient(String),
}

#[derive(Debug, Default)]
pub struct FetcherStats {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub init_failures: AtomicUsize,
}

/// Builder and factory for scripted fetchers.
#[derive(Debug, Clone, Default)]
pub struct FixtureFetcherFactory {
    pages: Arc<HashMap<u32, Page>>,
    init_error: Option<String>,
    delay: Duration,
    stats: Arc<FetcherStats>,
    queries: Arc<Mutex<Vec<(String, u32)>>>,
}

impl FixtureFetcherFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, offset: u32, blocks: Vec<RawBlock>) -> Self {
        Arc::make_mut(&mut self.pages).insert(offset, Page::Blocks(blocks));
        self
    }

    pub fn failing_page(mut self, offset: u32, message: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(offset, Page::Transient(message.to_string()));
        self
    }

    /// Every `acquire` fails with `FetchError::Init`.
    pub fn failing_init(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    /// Sleep before serving each page.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stats(&self) -> Arc<FetcherStats> {
        self.stats.clone()
    }

    /// `(query, offset)` of every page request, in order.
    pub fn requests(&self) -> Vec<(String, u32)> {
        self.queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl FetcherFactory for FixtureFetcherFactory {
    async fn acquire(&self) -> Result<Box<dyn PageFetcher>, FetchError> {
        if let Some(msg) = &self.init_error {
            self.stats.init_failures.fetch_add(1, Ordering::SeqCst);
            return Err(FetchError::init(msg));
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureFetcher {
            factory: self.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

struct FixtureFetcher {
    factory: FixtureFetcherFactory,
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch_page(&mut self, query: &str, offset: u32) -> Result<Vec<RawBlock>, FetchError> {
        self.factory
            .queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((query.to_string(), offset));
        if !self.factory.delay.is_zero() {
            tokio::time::sleep(self.factory.delay).await;
        }
        match self.factory.pages.get(&offset) {
            Some(Page::Blocks(b)) => Ok(b.clone()),
            Some(Page::Transient(msg)) => Err(FetchError::transient(offset, msg)),
            None => Ok(Vec::new()),
        }
    }

    async fn release(&mut self) {
        self.factory.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}
