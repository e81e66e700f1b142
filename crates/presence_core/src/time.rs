//! crates/presence_core/src/time.rs
//!
//! Pure time arithmetic for dwell-time accrual.
//!
//! Elapsed durations are kept as a normalized days/hours/minutes/seconds
//! breakdown. Two breakdowns are combined by going through total seconds and
//! normalizing again, so units always carry correctly.

use crate::error::{TrackingError, TrackingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Add;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// A normalized decomposition of an elapsed duration.
///
/// `hours` is always below 24, `minutes` below 60 and `seconds` below 60.
/// `seconds` keeps any fractional part; `days` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeBreakdown {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: f64,
}

impl TimeBreakdown {
    /// The empty duration.
    pub const ZERO: TimeBreakdown = TimeBreakdown {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0.0,
    };

    /// Decomposes a non-negative number of seconds.
    ///
    /// Negative, NaN and infinite deltas are rejected with `InvalidInput`.
    pub fn from_seconds(delta: f64) -> TrackingResult<Self> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(TrackingError::InvalidInput(format!(
                "time delta must be a finite, non-negative number of seconds (got {})",
                delta
            )));
        }
        Ok(Self::normalize(delta))
    }

    /// Converts the breakdown back into a total number of seconds.
    pub fn total_seconds(&self) -> f64 {
        self.days as f64 * SECONDS_PER_DAY
            + f64::from(self.hours) * SECONDS_PER_HOUR
            + f64::from(self.minutes) * SECONDS_PER_MINUTE
            + self.seconds
    }

    pub fn is_zero(&self) -> bool {
        self.total_seconds() == 0.0
    }

    // Caller guarantees `delta` is finite and non-negative.
    fn normalize(delta: f64) -> Self {
        let mut remainder = delta;

        let days = (remainder / SECONDS_PER_DAY).floor();
        remainder -= days * SECONDS_PER_DAY;

        let hours = (remainder / SECONDS_PER_HOUR).floor() % 24.0;
        remainder -= hours * SECONDS_PER_HOUR;

        let minutes = (remainder / SECONDS_PER_MINUTE).floor() % 60.0;
        remainder -= minutes * SECONDS_PER_MINUTE;

        // Guard against a remainder a hair below zero from float subtraction.
        let seconds = (remainder % 60.0).max(0.0);

        Self {
            days: days as u64,
            hours: hours as u8,
            minutes: minutes as u8,
            seconds,
        }
    }
}

impl Add for TimeBreakdown {
    type Output = TimeBreakdown;

    fn add(self, rhs: TimeBreakdown) -> TimeBreakdown {
        merge(&self, &rhs)
    }
}

/// Decomposes `delta_seconds` into a normalized breakdown.
pub fn breakdown(delta_seconds: f64) -> TrackingResult<TimeBreakdown> {
    TimeBreakdown::from_seconds(delta_seconds)
}

/// Combines two breakdowns by summing their totals and renormalizing.
pub fn merge(a: &TimeBreakdown, b: &TimeBreakdown) -> TimeBreakdown {
    let total = a.total_seconds() + b.total_seconds();
    // Both totals are non-negative, so the sum is too.
    TimeBreakdown::normalize(total.max(0.0))
}

/// Wall-clock seconds between two instants, with millisecond resolution.
///
/// Returns `None` when `end` is before `start`.
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
    let millis = end.signed_duration_since(start).num_milliseconds();
    if millis < 0 {
        None
    } else {
        Some(millis as f64 / 1000.0)
    }
}
