//! Time source for cache expiry and claim validation.
//!
//! Production code uses [`SystemClock`]. [`ManualClock`] lets tests pin and
//! advance time without sleeping.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to, with one-second resolution.
pub struct ManualClock {
    epoch_seconds: AtomicI64,
}

impl ManualClock {
    /// Create a clock pinned at the given Unix timestamp.
    pub fn at(epoch_seconds: i64) -> Self {
        Self {
            epoch_seconds: AtomicI64::new(epoch_seconds),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.epoch_seconds
            .fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    /// Current reading as a Unix timestamp.
    pub fn timestamp(&self) -> i64 {
        self.epoch_seconds.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("epoch_seconds", &self.timestamp())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp(), 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
