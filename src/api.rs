use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::cache::{RefreshScheduler, RefreshingCache};
use crate::ingest::types::NormalizedRecord;

pub const PRODUCED_AT_HEADER: &str = "x-produced-at";

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RefreshingCache>,
    /// Keeps the periodic refresher alive for as long as the router is.
    pub scheduler: Option<Arc<RefreshScheduler>>,
}

impl AppState {
    /// State without a scheduler; refreshes are driven by the caller.
    pub fn new(cache: Arc<RefreshingCache>) -> Self {
        Self {
            cache,
            scheduler: None,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_issues))
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// One served row; `instant` is local time as `YYYY-MM-DD HH:MM`.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct IssueRow {
    pub company: String,
    pub title: String,
    pub excerpt: String,
    pub url: String,
    pub instant: String,
}

impl From<&NormalizedRecord> for IssueRow {
    fn from(r: &NormalizedRecord) -> Self {
        Self {
            company: r.company.clone(),
            title: r.title.clone(),
            excerpt: r.excerpt.clone(),
            url: r.url.clone(),
            instant: r.instant.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

async fn list_issues(State(state): State<AppState>) -> (HeaderMap, Json<Vec<IssueRow>>) {
    let mut headers = HeaderMap::new();
    let Some(entry) = state.cache.entry() else {
        return (headers, Json(Vec::new()));
    };
    let stamp = entry.produced_at.format("%Y-%m-%d %H:%M:%S").to_string();
    if let Ok(v) = HeaderValue::from_str(&stamp) {
        headers.insert(PRODUCED_AT_HEADER, v);
    }
    let rows = entry.batch.iter().map(IssueRow::from).collect();
    (headers, Json(rows))
}
