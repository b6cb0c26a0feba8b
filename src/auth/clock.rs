//! Wall clock abstraction

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Signing reads it for the sign date, verification for the expiry check and
/// id generation for nanosecond entropy.
pub trait Clock: Send + Sync {
    /// Current UTC instant
    fn now(&self) -> DateTime<Utc>;

    /// Current unix time in seconds
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }

    /// Current unix time in nanoseconds, `0` if out of range
    fn unix_nanos(&self) -> i64 {
        self.now().timestamp_nanos_opt().unwrap_or_default()
    }
}

/// The operating system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Stop the clock at `time`
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time)
    }

    /// Stop the clock at a unix timestamp; out-of-range values pin the epoch
    pub fn at_unix(seconds: i64) -> Self {
        Self(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
