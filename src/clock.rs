//! Deterministic clock abstraction for testable time-dependent logic.
//!
//! Two independent readings are derived from the same [`Clock`]:
//! - [`reference_seconds`] feeds key expiration math (epoch seconds plus a
//!   fixed offset, no calendar or DST rules involved).
//! - [`LocalStamp`] renders human-readable visit timestamps in a fixed UTC
//!   offset.

use chrono::{DateTime, FixedOffset, Utc};

#[cfg(any(test, feature = "test-seams"))]
use std::sync::RwLock;

/// Clock trait for deterministic time in tests.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// System clock using actual wall time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing.
///
/// Shared across tasks behind an `Arc`, so advancing takes `&self`.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Create a mock clock frozen at the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Create a mock clock from an RFC 3339 string.
    pub fn from_rfc3339(s: &str) -> Self {
        Self::new(
            DateTime::parse_from_rfc3339(s)
                .expect("valid RFC 3339")
                .with_timezone(&Utc),
        )
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.write().expect("mock clock lock");
        *now += duration;
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.read().expect("mock clock lock")
    }
}

/// Reference time used for key expiration, in fractional seconds.
///
/// This is the Unix epoch reading shifted by a constant `offset_secs`. Stored
/// `expires_at` values are expressed on this scale, so the offset must stay
/// fixed for the lifetime of a key file.
pub fn reference_seconds(clock: &dyn Clock, offset_secs: i64) -> f64 {
    let now = clock.now_utc();
    now.timestamp_millis() as f64 / 1000.0 + offset_secs as f64
}

/// Human-readable local time and date for a visit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStamp {
    /// 12-hour clock time, e.g. `09:05:07 PM`.
    pub time: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
}

impl LocalStamp {
    /// Format the clock's current instant in the given fixed offset.
    pub fn now(clock: &dyn Clock, offset: FixedOffset) -> Self {
        let local = clock.now_utc().with_timezone(&offset);
        Self {
            time: local.format("%I:%M:%S %p").to_string(),
            date: local.format("%Y-%m-%d").to_string(),
        }
    }
}
