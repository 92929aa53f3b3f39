//! Per-venue round-trip latency tracking
//!
//! Fixed-size ring buffer per venue, written on the session hot path.
//! Recording is O(1) and allocation-free after the first sample for a
//! venue; the rolling average feeds router tie-breaking and status
//! snapshots.

use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Samples retained per venue for the rolling average.
pub const LATENCY_WINDOW: usize = 32;

#[derive(Debug)]
struct Window {
    samples: [u64; LATENCY_WINDOW],
    len: usize,
    next: usize,
    sum: u64,
}

impl Window {
    fn new() -> Self {
        Self {
            samples: [0; LATENCY_WINDOW],
            len: 0,
            next: 0,
            sum: 0,
        }
    }

    fn push(&mut self, ns: u64) {
        if self.len == LATENCY_WINDOW {
            self.sum -= self.samples[self.next];
        } else {
            self.len += 1;
        }
        self.samples[self.next] = ns;
        self.sum += ns;
        self.next = (self.next + 1) % LATENCY_WINDOW;
    }

    fn avg(&self) -> Option<u64> {
        if self.len == 0 {
            None
        } else {
            Some(self.sum / self.len as u64)
        }
    }
}

/// Rolling round-trip latency per venue.
///
/// Disabled trackers accept samples and drop them, so call sites need no
/// conditional of their own.
#[derive(Debug)]
pub struct LatencyTracker {
    windows: DashMap<String, Mutex<Window>>,
    enabled: bool,
}

impl LatencyTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            windows: DashMap::new(),
            enabled,
        }
    }

    /// Record one round-trip observation for a venue.
    pub fn record(&self, venue: &str, rtt: Duration) {
        if !self.enabled {
            return;
        }
        let ns = rtt.as_nanos().min(u64::MAX as u128) as u64;
        match self.windows.get(venue) {
            Some(window) => window.lock().push(ns),
            None => {
                let mut window = Window::new();
                window.push(ns);
                self.windows.insert(venue.to_string(), Mutex::new(window));
            }
        }
    }

    /// Rolling average over the last [`LATENCY_WINDOW`] samples, in
    /// nanoseconds. `None` until the first sample (or when disabled).
    pub fn rolling_avg_ns(&self, venue: &str) -> Option<u64> {
        self.windows.get(venue).and_then(|w| w.lock().avg())
    }

    /// Drop all samples for a venue (fresh session, stale history).
    pub fn clear(&self, venue: &str) {
        self.windows.remove(venue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_samples_no_average() {
        let tracker = LatencyTracker::new(true);
        assert_eq!(tracker.rolling_avg_ns("ARCA"), None);
    }

    #[test]
    fn average_over_recorded_samples() {
        let tracker = LatencyTracker::new(true);
        tracker.record("ARCA", Duration::from_nanos(100));
        tracker.record("ARCA", Duration::from_nanos(300));
        assert_eq!(tracker.rolling_avg_ns("ARCA"), Some(200));
    }

    #[test]
    fn window_evicts_oldest() {
        let tracker = LatencyTracker::new(true);
        // Fill the window with 1000ns, then push in 2000ns until the
        // original samples are fully evicted.
        for _ in 0..LATENCY_WINDOW {
            tracker.record("BATS", Duration::from_nanos(1000));
        }
        for _ in 0..LATENCY_WINDOW {
            tracker.record("BATS", Duration::from_nanos(2000));
        }
        assert_eq!(tracker.rolling_avg_ns("BATS"), Some(2000));
    }

    #[test]
    fn venues_are_independent() {
        let tracker = LatencyTracker::new(true);
        tracker.record("ARCA", Duration::from_nanos(100));
        tracker.record("BATS", Duration::from_nanos(900));
        assert_eq!(tracker.rolling_avg_ns("ARCA"), Some(100));
        assert_eq!(tracker.rolling_avg_ns("BATS"), Some(900));
    }

    #[test]
    fn disabled_tracker_drops_samples() {
        let tracker = LatencyTracker::new(false);
        tracker.record("ARCA", Duration::from_nanos(100));
        assert_eq!(tracker.rolling_avg_ns("ARCA"), None);
    }

    #[test]
    fn clear_resets_history() {
        let tracker = LatencyTracker::new(true);
        tracker.record("ARCA", Duration::from_nanos(100));
        tracker.clear("ARCA");
        assert_eq!(tracker.rolling_avg_ns("ARCA"), None);
    }
}
