//! Routing statistics

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    messages_processed: u64,
    velocity_adjustments: u64,
    malformed_events: u64,
    write_failures: u64,
}

/// Counters shared by the routes. They only ever go up.
///
/// All counters sit behind one lock so a snapshot sees them at the same
/// instant.
#[derive(Debug)]
pub struct Statistics {
    counts: Mutex<Counts>,
    start_time: Instant,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(Counts::default()),
            start_time: Instant::now(),
        }
    }

    /// Count a message that went through the transformer.
    pub fn record_message(&self, velocity_changed: bool) {
        let mut counts = self.counts.lock();
        counts.messages_processed += 1;
        if velocity_changed {
            counts.velocity_adjustments += 1;
        }
    }

    pub fn record_malformed(&self) {
        self.counts.lock().malformed_events += 1;
    }

    pub fn record_write_failure(&self) {
        self.counts.lock().write_failures += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counts = *self.counts.lock();
        StatsSnapshot {
            messages_processed: counts.messages_processed,
            velocity_adjustments: counts.velocity_adjustments,
            malformed_events: counts.malformed_events,
            write_failures: counts.write_failures,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values read at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub messages_processed: u64,
    pub velocity_adjustments: u64,
    pub malformed_events: u64,
    pub write_failures: u64,
    /// Time since the counters were created
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Messages per second since start.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.messages_processed as f64 / secs
        } else {
            0.0
        }
    }
}
