//! Periodic statistics logging.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::routing::{Statistics, StatsSnapshot, StopSignal};

/// Longest a reporter sleeps before checking the stop flag.
const TICK: Duration = Duration::from_millis(100);

/// Log one statistics line.
pub fn log_snapshot(snapshot: &StatsSnapshot) {
    info!(
        messages = snapshot.messages_processed,
        adjustments = snapshot.velocity_adjustments,
        malformed = snapshot.malformed_events,
        write_failures = snapshot.write_failures,
        rate = %format!("{:.1}", snapshot.rate()),
        "stats"
    );
}

/// Log a snapshot every `interval` until `stop` is set.
pub fn run_reporter(stats: Arc<Statistics>, interval: Duration, stop: StopSignal) {
    let mut next = Instant::now() + interval;
    while !stop.is_stopped() {
        let now = Instant::now();
        if now >= next {
            log_snapshot(&stats.snapshot());
            next += interval;
            continue;
        }
        thread::sleep((next - now).min(TICK));
    }
}
