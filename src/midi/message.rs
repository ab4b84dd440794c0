//! Channel voice messages as they travel through the router.
//!
//! Messages are values: transforms build a new message instead of
//! mutating the one they were given.

use crate::error::{Error, Result};

/// MIDI message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on: channel (0-15), note (0-127), velocity (0-127)
    NoteOn(u8, u8, u8),
    /// Note off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff(u8, u8, u8),
    /// Control change: channel (0-15), controller (0-127), value (0-127)
    ControlChange(u8, u8, u8),
    /// Program change: channel (0-15), program (0-127)
    ProgramChange(u8, u8),
    /// Anything else (pitch bend, aftertouch, system messages), kept as raw bytes
    Other(Vec<u8>),
}

impl MidiMessage {
    /// Decode a single message from raw bytes.
    ///
    /// Running status is not supported: the first byte must be a status byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&status, data) = bytes
            .split_first()
            .ok_or_else(|| Error::malformed("empty message"))?;

        if status < 0x80 {
            return Err(Error::malformed(format!(
                "expected status byte, got {:#04x}",
                status
            )));
        }

        let ch = status & 0x0F;
        let needed = match status & 0xF0 {
            0x80 | 0x90 | 0xB0 => 2,
            0xC0 => 1,
            _ => return Ok(MidiMessage::Other(bytes.to_vec())),
        };

        if data.len() < needed {
            return Err(Error::malformed(format!(
                "status {:#04x} needs {} data bytes, got {}",
                status,
                needed,
                data.len()
            )));
        }
        if let Some(bad) = data[..needed].iter().find(|b| **b > 0x7F) {
            return Err(Error::malformed(format!("data byte out of range: {:#04x}", bad)));
        }

        Ok(match status & 0xF0 {
            0x80 => MidiMessage::NoteOff(ch, data[0], data[1]),
            0x90 => MidiMessage::NoteOn(ch, data[0], data[1]),
            0xB0 => MidiMessage::ControlChange(ch, data[0], data[1]),
            _ => MidiMessage::ProgramChange(ch, data[0]),
        })
    }

    /// Convert to raw MIDI bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn(ch, note, vel) => vec![0x90 | (ch & 0x0F), note & 0x7F, vel & 0x7F],
            MidiMessage::NoteOff(ch, note, vel) => {
                vec![0x80 | (ch & 0x0F), note & 0x7F, vel & 0x7F]
            }
            MidiMessage::ControlChange(ch, ctrl, val) => {
                vec![0xB0 | (ch & 0x0F), ctrl & 0x7F, val & 0x7F]
            }
            MidiMessage::ProgramChange(ch, prog) => vec![0xC0 | (ch & 0x0F), prog & 0x7F],
            MidiMessage::Other(ref raw) => raw.clone(),
        }
    }

    /// Channel of a channel voice message we understand.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOn(ch, ..)
            | MidiMessage::NoteOff(ch, ..)
            | MidiMessage::ControlChange(ch, ..)
            | MidiMessage::ProgramChange(ch, _) => Some(ch),
            MidiMessage::Other(_) => None,
        }
    }

    /// Copy of this message on another channel. `Other` is returned as is.
    pub fn with_channel(&self, channel: u8) -> Self {
        let ch = channel & 0x0F;
        match *self {
            MidiMessage::NoteOn(_, note, vel) => MidiMessage::NoteOn(ch, note, vel),
            MidiMessage::NoteOff(_, note, vel) => MidiMessage::NoteOff(ch, note, vel),
            MidiMessage::ControlChange(_, ctrl, val) => MidiMessage::ControlChange(ch, ctrl, val),
            MidiMessage::ProgramChange(_, prog) => MidiMessage::ProgramChange(ch, prog),
            MidiMessage::Other(ref raw) => MidiMessage::Other(raw.clone()),
        }
    }

    /// Velocity of a note message.
    pub fn velocity(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOn(_, _, vel) | MidiMessage::NoteOff(_, _, vel) => Some(vel),
            _ => None,
        }
    }

    /// Copy of a note message with a new velocity. Other messages are cloned unchanged.
    pub fn with_velocity(&self, velocity: u8) -> Self {
        let vel = velocity & 0x7F;
        match *self {
            MidiMessage::NoteOn(ch, note, _) => MidiMessage::NoteOn(ch, note, vel),
            MidiMessage::NoteOff(ch, note, _) => MidiMessage::NoteOff(ch, note, vel),
            _ => self.clone(),
        }
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            MidiMessage::NoteOn(..) => "note_on",
            MidiMessage::NoteOff(..) => "note_off",
            MidiMessage::ControlChange(..) => "control_change",
            MidiMessage::ProgramChange(..) => "program_change",
            MidiMessage::Other(_) => "other",
        }
    }
}
