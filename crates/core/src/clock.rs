// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Station time: schedule deadlines and log timestamps.
//!
//! Departure times, return times, and the watchdog's grace window are all
//! monotonic deadlines computed against a `Clock`, so every scheduling
//! decision can be exercised in tests by cranking a fake clock instead of
//! sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the station.
///
/// `deadline`/`expired`/`until` carry the scheduling vocabulary: a bus's
/// `departure_time` is a deadline, the watchdog forces a bus out once that
/// deadline plus the grace period has expired, and the active driver naps
/// for at most `until` the next departure. `epoch_ms` stamps log lines.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;

    /// The deadline falling `after` from now.
    fn deadline(&self, after: Duration) -> Instant {
        self.now() + after
    }

    /// Whether `deadline` has been reached.
    fn expired(&self, deadline: Instant) -> bool {
        self.now() >= deadline
    }

    /// Time left until `deadline`, zero once it has passed.
    fn until(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(self.now())
    }
}

/// The wall clock the real simulation runs on.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Hand-cranked clock for scheduling tests: time stands still until the
/// test advances it.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeNow>>,
}

struct FakeNow {
    now: Instant,
    epoch_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNow {
                now: Instant::now(),
                epoch_ms: 1_700_000_000_000,
            })),
        }
    }

    /// Crank time forward. Clones share the crank.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock();
        inner.now += by;
        inner.epoch_ms += by.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
