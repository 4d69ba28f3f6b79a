// src/timeparse.rs
//! Relative / absolute time expression parser.
//!
//! Listing pages stamp each result with text such as `6시간 전` ("6 hours ago")
//! or `2024. 10. 23.`. The parser resolves that text against a caller-supplied
//! `now` using an ordered table of patterns; the first match wins.
//!
//! Month and year offsets are fixed approximations (30 and 365 days). They are
//! not calendar arithmetic and must stay that way: the window filter depends on
//! exact, reproducible offsets.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{ParseFailure, PatternOverlap};

/// Unit of a relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    /// 30 days.
    Months,
    /// 365 days.
    Years,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// `quantity` units as a duration, or `None` on overflow.
    fn span(self, quantity: i64) -> Option<Duration> {
        match self {
            TimeUnit::Minutes => Duration::try_minutes(quantity),
            TimeUnit::Hours => Duration::try_hours(quantity),
            TimeUnit::Days => Duration::try_days(quantity),
            TimeUnit::Weeks => Duration::try_weeks(quantity),
            TimeUnit::Months => quantity.checked_mul(30).and_then(Duration::try_days),
            TimeUnit::Years => quantity.checked_mul(365).and_then(Duration::try_days),
        }
    }
}

/// How a matched pattern becomes an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `now - quantity * unit`; capture group 1 holds the quantity.
    Relative(TimeUnit),
    /// Local midnight of the date in capture groups 1..=3 (year, month, day).
    AbsoluteDate,
}

/// One row of the pattern table.
#[derive(Debug, Clone)]
pub struct TimePattern {
    pub name: &'static str,
    regex: Regex,
    resolution: Resolution,
    /// A well-formed input this pattern is meant to accept. Used to verify the
    /// table has no overlapping rows.
    canonical: &'static str,
}

impl TimePattern {
    /// `pattern` is anchored at the start of the input automatically.
    pub fn new(
        name: &'static str,
        pattern: &str,
        resolution: Resolution,
        canonical: &'static str,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            name,
            regex,
            resolution,
            canonical,
        })
    }

    fn resolve(&self, caps: &Captures<'_>, now: NaiveDateTime) -> Result<NaiveDateTime, ParseFailure> {
        match self.resolution {
            Resolution::Relative(unit) => {
                let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let quantity = raw
                    .parse::<i64>()
                    .map_err(|_| ParseFailure::InvalidQuantity { raw: raw.to_string() })?;
                let out_of_range = || ParseFailure::OutOfRange {
                    quantity,
                    unit: unit.as_str(),
                };
                let span = unit.span(quantity).ok_or_else(out_of_range)?;
                now.checked_sub_signed(span).ok_or_else(out_of_range)
            }
            Resolution::AbsoluteDate => {
                let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
                let invalid = |raw: &str| ParseFailure::InvalidQuantity { raw: raw.to_string() };
                let year: i32 = field(1).parse().map_err(|_| invalid(field(1)))?;
                let month: u32 = field(2).parse().map_err(|_| invalid(field(2)))?;
                let day: u32 = field(3).parse().map_err(|_| invalid(field(3)))?;
                NaiveDate::from_ymd_opt(year, month, day)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .ok_or(ParseFailure::InvalidDate { year, month, day })
            }
        }
    }
}

/// Ordered pattern table. Order matters only as a tie-breaker, and the
/// constructor rejects tables where a tie is possible on canonical inputs.
#[derive(Debug, Clone)]
pub struct TimeExpressionParser {
    patterns: Vec<TimePattern>,
}

static KOREAN: Lazy<TimeExpressionParser> = Lazy::new(|| {
    let rel = |name: &'static str, unit_text: &str, unit: TimeUnit, canonical: &'static str| {
        TimePattern::new(
            name,
            &format!(r"(\d+)\s*{unit_text} 전"),
            Resolution::Relative(unit),
            canonical,
        )
        .expect("static time pattern")
    };
    let patterns = vec![
        rel("hours-ago", "시간", TimeUnit::Hours, "6시간 전"),
        rel("minutes-ago", "분", TimeUnit::Minutes, "15분 전"),
        rel("days-ago", "일", TimeUnit::Days, "3일 전"),
        rel("weeks-ago", "주", TimeUnit::Weeks, "2주 전"),
        rel("months-ago", "개월", TimeUnit::Months, "1개월 전"),
        rel("years-ago", "년", TimeUnit::Years, "1년 전"),
        TimePattern::new(
            "absolute-date",
            r"(\d{4})\.\s*(\d{1,2})\.\s*(\d{1,2})\.",
            Resolution::AbsoluteDate,
            "2024. 10. 23.",
        )
        .expect("static time pattern"),
    ];
    TimeExpressionParser::new(patterns).expect("built-in time patterns overlap")
});

impl TimeExpressionParser {
    /// Build a parser, verifying that every pattern's canonical input is
    /// matched by that pattern and by no other.
    pub fn new(patterns: Vec<TimePattern>) -> Result<Self, PatternOverlap> {
        for (i, p) in patterns.iter().enumerate() {
            for (j, other) in patterns.iter().enumerate() {
                let matches = other.regex.is_match(p.canonical);
                if i == j && !matches {
                    return Err(PatternOverlap {
                        first: p.name,
                        second: p.name,
                        sample: p.canonical,
                    });
                }
                if i != j && matches {
                    return Err(PatternOverlap {
                        first: p.name,
                        second: other.name,
                        sample: p.canonical,
                    });
                }
            }
        }
        Ok(Self { patterns })
    }

    /// The listing format served to Korean-locale clients.
    pub fn korean() -> &'static Self {
        &KOREAN
    }

    pub fn patterns(&self) -> impl Iterator<Item = &TimePattern> {
        self.patterns.iter()
    }

    /// Resolve `text` against `now`. Never falls back to a default instant.
    pub fn parse(&self, text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ParseFailure> {
        let text = text.trim();
        for p in &self.patterns {
            if let Some(caps) = p.regex.captures(text) {
                return p.resolve(&caps, now);
            }
        }
        Err(ParseFailure::NoMatch(text.to_string()))
    }
}
