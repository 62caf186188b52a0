use chrono::{DateTime, FixedOffset, TimeDelta, Timelike, Utc};
use std::sync::{Arc, Mutex};

/// Wall-clock abstraction used wherever "now" matters to dosing.
///
/// - now(): current instant in UTC
/// - local_hour(): hour of day in the given offset, 0..=23
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Hour of day at `offset`, derived from `now()`.
    fn local_hour(&self, offset: FixedOffset) -> u32 {
        self.now().with_timezone(&offset).hour()
    }
}

/// Default clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock whose time is set by hand.
///
/// Clones share the same instant, so a test can keep a handle and move time
/// forward while the engine holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    at: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at: Arc::new(Mutex::new(at)),
        }
    }

    /// Advance the clock by the given delta.
    pub fn advance(&self, d: TimeDelta) {
        if let Ok(mut at) = self.at.lock() {
            *at += d;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut at) = self.at.lock() {
            *at = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.at.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
