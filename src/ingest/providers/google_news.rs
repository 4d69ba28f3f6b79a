// src/ingest/providers/google_news.rs
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::error::FetchError;
use crate::ingest::types::{FetcherFactory, PageFetcher, RawBlock};

const SEARCH_URL: &str = "https://www.google.com/search";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static RESULT: Lazy<Selector> = Lazy::new(|| selector("#rso > div > div > div"));
static FIELDS: Lazy<Selector> = Lazy::new(|| selector("div > div > a > div > div:nth-child(2) > div"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("div > div > a"));

/// Fetches news-tab search result pages over plain HTTP.
pub struct GoogleNewsFetcherFactory {
    base_url: String,
}

impl GoogleNewsFetcherFactory {
    pub fn new() -> Self {
        Self::with_base_url(SEARCH_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

impl Default for GoogleNewsFetcherFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetcherFactory for GoogleNewsFetcherFactory {
    async fn acquire(&self) -> Result<Box<dyn PageFetcher>, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(FetchError::init)?;
        Ok(Box::new(GoogleNewsFetcher {
            client,
            base_url: self.base_url.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "google-news"
    }
}

struct GoogleNewsFetcher {
    client: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl PageFetcher for GoogleNewsFetcher {
    async fn fetch_page(&mut self, query: &str, offset: u32) -> Result<Vec<RawBlock>, FetchError> {
        let start = offset.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("tbm", "nws"), ("start", start.as_str())])
            .header(reqwest::header::ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9")
            .send()
            .await
            .map_err(|e| FetchError::transient(offset, e))?;

        let status = resp.status();
        if !status.is_success() {
            counter!("crawl_http_status_errors_total").increment(1);
            return Err(FetchError::transient(offset, format!("HTTP {status}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::transient(offset, e))?;
        Ok(parse_result_page(&body))
    }

    async fn release(&mut self) {}
}

fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("static result page selector")
}

/// Split a result page into blocks of text fields plus link.
pub fn parse_result_page(html: &str) -> Vec<RawBlock> {
    let doc = Html::parse_document(html);
    let blocks = doc
        .select(&RESULT)
        .map(|post| {
            let fields = post
                .select(&FIELDS)
                .map(|f| f.text().collect::<Vec<_>>().join(" "))
                .collect();
            let link = post
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);
            RawBlock { fields, link }
        })
        .collect();
    blocks
}
