//! Rate limiting for progress callbacks.

use std::time::{Duration, Instant};

/// Lets an event through at most once per interval. The first event always
/// passes.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and records `now` if an interval has passed since the
    /// last event that got through.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
