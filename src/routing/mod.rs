//! Message routing
//!
//! Two long-lived routes move messages from inputs to the shared output:
//! the primary route shapes velocities and stamps the current channel, the
//! optional control route turns program changes into channel switches.
//! They share nothing but the [`ChannelState`], the [`Statistics`], the
//! [`SharedOutput`] and a [`StopSignal`].

mod channel;
mod control;
mod primary;
mod stats;
mod stream;
mod transform;

pub use channel::{ChannelControl, ChannelState, DEFAULT_CHANNEL, MAX_CHANNEL};
pub use control::ControlRoute;
pub use primary::PrimaryRoute;
pub use stats::{Statistics, StatsSnapshot};
pub use stream::{InputStream, MemorySink, OutputSink, QueueInput, SharedOutput};
pub use transform::{MessageTransformer, DEFAULT_FILTER_CONTROL, MOD_WHEEL};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

/// How long a route blocks on its input before checking for a stop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle of a route. There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Running,
    Stopped,
}

/// Why a route left its loop.
#[derive(Debug)]
pub enum RouteExit {
    /// A stop was requested
    Stopped,
    /// The input queue closed
    StreamEnded,
    /// The input stream failed
    Failed(Error),
}

/// Shared stop flag. Setting it is a single atomic store, so it can be
/// done from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` for the call that actually stopped it.
    pub fn stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_idempotent() {
        let signal = StopSignal::new();
        let other = signal.clone();

        assert!(!signal.is_stopped());
        assert!(other.stop());
        assert!(!signal.stop());
        assert!(signal.is_stopped());
    }
}
