//! Primary route: main input -> transformer -> output.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::{
    ChannelControl, ChannelState, InputStream, MessageTransformer, RouteExit,
    SharedOutput, Statistics, StopSignal, POLL_INTERVAL,
};
use crate::error::Error;
use crate::midi::MidiMessage;

pub struct PrimaryRoute {
    input: Box<dyn InputStream>,
    output: SharedOutput,
    transformer: MessageTransformer,
    channel: ChannelState,
    control: ChannelControl,
    stats: Arc<Statistics>,
    stop: StopSignal,
    poll_interval: Duration,
}

impl PrimaryRoute {
    pub fn new(
        input: Box<dyn InputStream>,
        output: SharedOutput,
        transformer: MessageTransformer,
        channel: ChannelState,
        control: ChannelControl,
        stats: Arc<Statistics>,
        stop: StopSignal,
    ) -> Self {
        Self {
            input,
            output,
            transformer,
            channel,
            control,
            stats,
            stop,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override how long each read blocks before the stop flag is checked
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until stopped or the input ends.
    ///
    /// The stop flag is checked once per received message, before it is
    /// processed; a message already being processed is always forwarded.
    pub fn run(mut self) -> RouteExit {
        info!(route = "primary", input = self.input.name(), "route started");

        let exit = loop {
            match self.input.recv_timeout(self.poll_interval) {
                Ok(Some(bytes)) => {
                    if self.stop.is_stopped() {
                        break RouteExit::Stopped;
                    }
                    self.handle(&bytes);
                }
                Ok(None) => {
                    if self.stop.is_stopped() {
                        break RouteExit::Stopped;
                    }
                }
                Err(Error::Disconnected(name)) => {
                    info!(route = "primary", input = %name, "input stream ended");
                    break RouteExit::StreamEnded;
                }
                Err(e) => {
                    error!(route = "primary", error = %e, "input stream failed");
                    break RouteExit::Failed(e);
                }
            }
        };

        info!(route = "primary", ?exit, "route stopped");
        exit
    }

    fn handle(&mut self, bytes: &[u8]) {
        let msg = match MidiMessage::from_bytes(bytes) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(route = "primary", error = %e, "skipping malformed message");
                self.stats.record_malformed();
                return;
            }
        };

        if let Some(channel) = self.control.channel_for_primary(&msg) {
            match self.channel.set(channel) {
                Ok(previous) if previous != channel => {
                    info!(from = previous, to = channel, "channel changed")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "ignoring channel change"),
            }
        }

        if let Some(out) = self.transformer.transform(&msg, &self.channel) {
            if let Err(e) = self.output.send(&out) {
                warn!(route = "primary", kind = out.kind(), error = %e, "output write failed");
                self.stats.record_write_failure();
            }
        }
    }
}
