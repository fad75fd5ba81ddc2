//! Per-directory event coalescing.

use std::time::{Duration, Instant};

/// Turns a burst of events into a single firing.
///
/// The first event after a quiet period opens a window; further events in
/// the window are absorbed; the window's end is the firing time. Two
/// firings are always at least one window apart.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
    last_fire: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            last_fire: None,
        }
    }

    pub fn record(&mut self, now: Instant) {
        if self.deadline.is_some() {
            return;
        }
        let mut deadline = now + self.window;
        if let Some(last) = self.last_fire {
            deadline = deadline.max(last + self.window);
        }
        self.deadline = Some(deadline);
    }

    /// When the pending window closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Close the window if its deadline has passed. Returns whether it did.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.last_fire = Some(now);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(75);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_fires_once_at_window_end() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.record(t0);
        d.record(t0 + ms(50));

        assert!(!d.fire(t0 + ms(74)));
        assert!(d.fire(t0 + ms(75)));
        assert!(!d.fire(t0 + ms(200)));
    }

    #[test]
    fn test_quiet_debouncer_never_fires() {
        let mut d = Debouncer::new(WINDOW);
        assert!(d.deadline().is_none());
        assert!(!d.fire(Instant::now()));
    }

    #[test]
    fn test_firings_are_a_window_apart() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.record(t0);
        assert!(d.fire(t0 + ms(80)));

        // An event right after a firing waits a full window from that firing.
        d.record(t0 + ms(81));
        assert_eq!(d.deadline(), Some(t0 + ms(156)));
        assert!(!d.fire(t0 + ms(154)));
        assert!(d.fire(t0 + ms(156)));
    }

    #[test]
    fn test_late_event_opens_fresh_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.record(t0);
        assert!(d.fire(t0 + ms(75)));
        d.record(t0 + ms(1000));
        assert_eq!(d.deadline(), Some(t0 + ms(1075)));
    }
}
