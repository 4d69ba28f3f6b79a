// src/error.rs
//! Error taxonomy for the ingest path.
//!
//! Every error here is contained inside one crawl run: a bad time string drops
//! one record, a bad block skips one record, a bad page skips one page. Only
//! the refresh layer decides what a whole run's failure means for the cache.

use thiserror::Error;

/// Time text could not be resolved to an instant. The record is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("no time pattern matches {0:?}")]
    NoMatch(String),

    #[error("quantity {raw:?} is not a non-negative integer")]
    InvalidQuantity { raw: String },

    #[error("offset of {quantity} {unit} overflows the clock range")]
    OutOfRange { quantity: i64, unit: &'static str },

    #[error("{year}-{month}-{day} is not a calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// A fetched block could not be turned into a record. The record is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("block has no link")]
    MissingLink,

    #[error("block has no text fields")]
    NoFields,
}

/// Page-level and fetcher-level failures.
#[derive(Error, Debug)]
pub enum FetchError {
    /// One page could not be retrieved; the run backs off and moves on.
    #[error("transient fetch error at offset {offset}: {message}")]
    Transient { offset: u32, message: String },

    /// The fetcher itself could not be acquired; the run yields nothing.
    #[error("fetcher unavailable: {0}")]
    Init(String),
}

impl FetchError {
    pub fn transient(offset: u32, message: impl std::fmt::Display) -> Self {
        Self::Transient {
            offset,
            message: message.to_string(),
        }
    }

    pub fn init(message: impl std::fmt::Display) -> Self {
        Self::Init(message.to_string())
    }
}

/// Two time patterns accept the same canonical input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("time patterns {first:?} and {second:?} both match {sample:?}")]
pub struct PatternOverlap {
    pub first: &'static str,
    pub second: &'static str,
    pub sample: &'static str,
}
