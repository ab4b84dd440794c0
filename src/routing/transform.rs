//! Per-message transformation on the primary route.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{ChannelState, Statistics};
use crate::curve::VelocityCurveConfig;
use crate::midi::MidiMessage;

/// Control number that keeps following the active channel (mod wheel).
pub const MOD_WHEEL: u8 = 1;

/// Control number swallowed by default (used as a side-channel signal).
pub const DEFAULT_FILTER_CONTROL: u8 = 65;

/// Applies the velocity curve and the current channel to single messages.
pub struct MessageTransformer {
    curve: VelocityCurveConfig,
    filter_control: u8,
    stats: Arc<Statistics>,
}

impl MessageTransformer {
    pub fn new(curve: VelocityCurveConfig, stats: Arc<Statistics>) -> Self {
        Self {
            curve,
            filter_control: DEFAULT_FILTER_CONTROL,
            stats,
        }
    }

    /// Set the control number that is dropped instead of forwarded
    pub fn with_filter_control(mut self, control: u8) -> Self {
        self.filter_control = control;
        self
    }

    /// Produce the message to forward, or `None` if it is filtered.
    ///
    /// The input is never modified. Notes get the shaped velocity (velocity
    /// 0 is left alone) and every known message except control changes is
    /// moved to the current channel; control changes keep their channel
    /// unless they are the mod wheel.
    pub fn transform(&self, msg: &MidiMessage, channel: &ChannelState) -> Option<MidiMessage> {
        if let MidiMessage::Other(_) = msg {
            self.stats.record_message(false);
            return Some(msg.clone());
        }

        let mut out = msg.clone();
        let mut changed = false;

        if let Some(velocity) = msg.velocity().filter(|v| *v > 0) {
            let shaped = self.shape(velocity);
            if shaped != velocity {
                debug!(from = velocity, to = shaped, "velocity adjusted");
                out = out.with_velocity(shaped);
                changed = true;
            }
        }
        self.stats.record_message(changed);

        match out {
            MidiMessage::ControlChange(_, control, _) if control == self.filter_control => {
                debug!(control, "filtering control change");
                None
            }
            MidiMessage::ControlChange(_, control, _) if control != MOD_WHEEL => Some(out),
            _ => Some(out.with_channel(channel.current())),
        }
    }

    fn shape(&self, velocity: u8) -> u8 {
        match self.curve.adjust(velocity) {
            Ok(shaped) => shaped,
            Err(e) => {
                warn!(velocity, error = %e, "velocity curve failed, passing through");
                velocity
            }
        }
    }
}
