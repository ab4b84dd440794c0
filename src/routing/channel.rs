//! Output channel shared between routes, and the two ways of changing it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::midi::MidiMessage;

/// Highest MIDI channel number (0-based).
pub const MAX_CHANNEL: u8 = 15;

/// Channel used until a control message says otherwise.
pub const DEFAULT_CHANNEL: u8 = 1;

/// The current output channel.
///
/// Cloning gives another handle to the same value. Reads and writes are
/// single atomic operations; the last write wins.
#[derive(Debug, Clone)]
pub struct ChannelState {
    current: Arc<AtomicU8>,
}

impl ChannelState {
    pub fn new(initial: u8) -> Result<Self> {
        check_channel(initial)?;
        Ok(Self {
            current: Arc::new(AtomicU8::new(initial)),
        })
    }

    pub fn current(&self) -> u8 {
        self.current.load(Ordering::Acquire)
    }

    /// Store a new channel and return the previous one.
    pub fn set(&self, channel: u8) -> Result<u8> {
        check_channel(channel)?;
        Ok(self.current.swap(channel, Ordering::AcqRel))
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            current: Arc::new(AtomicU8::new(DEFAULT_CHANNEL)),
        }
    }
}

fn check_channel(channel: u8) -> Result<()> {
    if channel > MAX_CHANNEL {
        return Err(Error::invalid(format!(
            "channel must be in 0..=15, got {}",
            channel
        )));
    }
    Ok(())
}

/// How the output channel gets changed while running. Exactly one
/// mechanism is active per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelControl {
    /// Channel never changes
    Fixed,
    /// Program changes on a separate control input select the channel:
    /// `channel = program - program_offset`
    ControlPort { program_offset: u8 },
    /// A control change on the primary input selects the channel directly,
    /// when its value lies in `min_value..=max_value`
    PrimaryCc {
        control: u8,
        min_value: u8,
        max_value: u8,
    },
}

impl ChannelControl {
    /// Default control number for [`ChannelControl::PrimaryCc`].
    pub const DEFAULT_CONTROL: u8 = 94;

    /// Program-offset convention used unless configured otherwise.
    pub const DEFAULT_PROGRAM_OFFSET: u8 = 1;

    pub fn control_port() -> Self {
        ChannelControl::ControlPort {
            program_offset: Self::DEFAULT_PROGRAM_OFFSET,
        }
    }

    pub fn primary_cc() -> Self {
        ChannelControl::PrimaryCc {
            control: Self::DEFAULT_CONTROL,
            min_value: 1,
            max_value: MAX_CHANNEL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChannelControl::Fixed => "fixed",
            ChannelControl::ControlPort { .. } => "control_port",
            ChannelControl::PrimaryCc { .. } => "primary_cc",
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let ChannelControl::PrimaryCc {
            control,
            min_value,
            max_value,
        } = *self
        {
            if control > 127 {
                return Err(Error::invalid(format!(
                    "channel control number must be in 0..=127, got {}",
                    control
                )));
            }
            if min_value > max_value || max_value > MAX_CHANNEL {
                return Err(Error::invalid(format!(
                    "channel control range {}..={} is not within 0..=15",
                    min_value, max_value
                )));
            }
        }
        Ok(())
    }

    /// Channel selected by a program change on the control input.
    ///
    /// `None` when this mechanism is not active or the result would not be
    /// a valid channel.
    pub fn channel_for_program(&self, program: u8) -> Option<u8> {
        match *self {
            ChannelControl::ControlPort { program_offset } => program
                .checked_sub(program_offset)
                .filter(|ch| *ch <= MAX_CHANNEL),
            _ => None,
        }
    }

    /// Channel selected by a message on the primary input, if it is the
    /// configured trigger.
    pub fn channel_for_primary(&self, msg: &MidiMessage) -> Option<u8> {
        match (*self, msg) {
            (
                ChannelControl::PrimaryCc {
                    control,
                    min_value,
                    max_value,
                },
                MidiMessage::ControlChange(_, ctrl, value),
            ) if *ctrl == control && (min_value..=max_value).contains(value) => Some(*value),
            _ => None,
        }
    }
}

impl Default for ChannelControl {
    fn default() -> Self {
        ChannelControl::primary_cc()
    }
}
