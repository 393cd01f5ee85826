//! Events-per-second counter
//!
//! Tracks a sliding window of event timestamps to compute an observed
//! rate, the input the Capture Watchdog's "observed FPS ≥ configured + 10"
//! rule (spec.md §4.2) depends on.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A sliding-window events-per-second counter.
pub struct EventsPerSecond {
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl EventsPerSecond {
    pub fn new(window: Duration) -> Self {
        Self { window, timestamps: VecDeque::new() }
    }

    /// Records one event at `now`.
    pub fn record(&mut self, now: Instant) {
        self.timestamps.push_back(now);
        self.prune(now);
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// The observed rate over the trailing window, evaluated at `now`.
    pub fn rate(&mut self, now: Instant) -> f64 {
        self.prune(now);
        self.timestamps.len() as f64 / self.window.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_counter_has_zero_rate() {
        let mut eps = EventsPerSecond::new(Duration::from_secs(1));
        assert_eq!(eps.rate(Instant::now()), 0.0);
    }

    #[test]
    fn rate_counts_events_within_the_window() {
        let mut eps = EventsPerSecond::new(Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..5 {
            eps.record(start);
        }
        assert_eq!(eps.rate(start), 5.0);
    }

    #[test]
    fn stale_events_fall_out_of_the_window() {
        let mut eps = EventsPerSecond::new(Duration::from_millis(10));
        let start = Instant::now();
        eps.record(start);
        let later = start + Duration::from_millis(50);
        assert_eq!(eps.rate(later), 0.0);
    }
}
