// src/ingest/providers/mod.rs
pub mod fixture;
#[cfg(feature = "ingest-http")]
pub mod google_news;
