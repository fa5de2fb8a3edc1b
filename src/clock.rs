//! Time source abstraction.
//!
//! The engine never calls `Utc::now()` directly; it asks a [`Clock`] so
//! tests can pin or advance time. Two notions of "now" exist: UTC for audit
//! timestamps, and campus-local wall clock for comparisons against ride
//! requested times (which are stored as local naive datetimes).

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC, for audit timestamps.
    fn now(&self) -> DateTime<Utc>;

    /// Current campus-local wall-clock time, for comparisons against
    /// requested ride times.
    fn now_local(&self) -> NaiveDateTime;
}

/// The real clock. Assumes the process runs in the campus time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A pinned clock for tests and demos; can be advanced explicitly.
#[derive(Debug)]
pub struct FixedClock {
    inner: Mutex<FixedInstant>,
}

#[derive(Debug, Clone, Copy)]
struct FixedInstant {
    utc: DateTime<Utc>,
    local: NaiveDateTime,
}

impl FixedClock {
    pub fn new(utc: DateTime<Utc>, local: NaiveDateTime) -> Self {
        FixedClock {
            inner: Mutex::new(FixedInstant { utc, local }),
        }
    }

    /// Pins both clocks from a single local timestamp, treating it as if it
    /// were also the UTC instant. Good enough for engine tests, which only
    /// ever compare like with like.
    pub fn at_local(local: NaiveDateTime) -> Self {
        Self::new(local.and_utc(), local)
    }

    /// Moves both clocks forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut inner = self.inner.lock().expect("fixed clock lock poisoned");
        inner.utc += by;
        inner.local += by;
    }

    /// Re-pins both clocks from a local timestamp.
    pub fn set_local(&self, local: NaiveDateTime) {
        let mut inner = self.inner.lock().expect("fixed clock lock poisoned");
        inner.utc = local.and_utc();
        inner.local = local;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().expect("fixed clock lock poisoned").utc
    }

    fn now_local(&self) -> NaiveDateTime {
        self.inner.lock().expect("fixed clock lock poisoned").local
    }
}
