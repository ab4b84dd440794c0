//! Control route: secondary input that selects the output channel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{
    ChannelControl, ChannelState, InputStream, RouteExit, SharedOutput, Statistics,
    StopSignal, DEFAULT_FILTER_CONTROL, POLL_INTERVAL,
};
use crate::error::Error;
use crate::midi::MidiMessage;

/// Reads the control input. Program changes switch the channel, the filter
/// control is swallowed, everything else is forwarded as is.
pub struct ControlRoute {
    input: Box<dyn InputStream>,
    output: SharedOutput,
    channel: ChannelState,
    control: ChannelControl,
    filter_control: u8,
    stats: Arc<Statistics>,
    stop: StopSignal,
    poll_interval: Duration,
}

impl ControlRoute {
    pub fn new(
        input: Box<dyn InputStream>,
        output: SharedOutput,
        channel: ChannelState,
        program_offset: u8,
        stats: Arc<Statistics>,
        stop: StopSignal,
    ) -> Self {
        Self {
            input,
            output,
            channel,
            control: ChannelControl::ControlPort { program_offset },
            filter_control: DEFAULT_FILTER_CONTROL,
            stats,
            stop,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_filter_control(mut self, control: u8) -> Self {
        self.filter_control = control;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until stopped or the input ends.
    pub fn run(mut self) -> RouteExit {
        info!(route = "control", input = self.input.name(), "route started");

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
                    info!(route = "control", input = %name, "input stream ended");
                    break RouteExit::StreamEnded;
                }
                Err(e) => {
                    error!(route = "control", error = %e, "input stream failed");
                    break RouteExit::Failed(e);
                }
            }
        };

        info!(route = "control", ?exit, "route stopped");
        exit
    }

    fn handle(&mut self, bytes: &[u8]) {
        let msg = match MidiMessage::from_bytes(bytes) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(route = "control", error = %e, "skipping malformed message");
                self.stats.record_malformed();
                return;
            }
        };

        match msg {
            MidiMessage::ProgramChange(_, program) => {
                match self.control.channel_for_program(program) {
                    Some(channel) => match self.channel.set(channel) {
                        Ok(previous) => info!(from = previous, to = channel, program, "channel changed"),
                        Err(e) => warn!(error = %e, "ignoring channel change"),
                    },
                    None => warn!(program, "program change does not select a valid channel"),
                }
            }
            MidiMessage::ControlChange(_, control, _) if control == self.filter_control => {
                debug!(route = "control", control, "swallowing control change");
            }
            other => {
                if let Err(e) = self.output.send(&other) {
                    warn!(route = "control", kind = other.kind(), error = %e, "output write failed");
                    self.stats.record_write_failure();
                }
            }
        }
    }
}
