use chrono::{DateTime, Utc};
use std::time::Duration;

/// One completed measurement of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub duration: Duration,
    /// Wall-clock instant the measured work finished
    pub end: DateTime<Utc>,
}

impl Reading {
    pub fn new(duration: Duration, end: DateTime<Utc>) -> Self {
        Reading { duration, end }
    }

    /// Duration as fractional milliseconds.
    ///
    /// Goes through nanoseconds so whole-millisecond durations convert exactly.
    #[inline]
    pub fn millis(&self) -> f64 {
        duration_millis(self.duration)
    }
}

#[inline]
pub(crate) fn duration_millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}
