// src/clock.rs
//! Wall clock abstraction.
//!
//! All instants in this crate are naive local date-times: the deployment runs
//! on one fixed local clock and no timezone conversion happens anywhere.

use chrono::{Local, NaiveDateTime};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a settable instant. Used for deterministic runs.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at: Mutex::new(at) }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.at.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.at.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_returns_what_was_set() {
        let t0 = NaiveDate::from_ymd_opt(2024, 12, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);

        let t1 = t0 + chrono::Duration::minutes(5);
        clock.set(t1);
        assert_eq!(clock.now(), t1);
    }
}
