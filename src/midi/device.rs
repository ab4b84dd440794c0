//! Hardware MIDI ports through `midir`.
//!
//! Ports are picked by a case-insensitive fragment of their name. Input
//! callbacks push raw bytes into a queue that a route reads from; the
//! connection itself stays with the caller, and dropping it ends the
//! stream.
//!
//! midir does not report unplugged devices. A port that disappears just
//! goes quiet, so its route keeps running until it is stopped.
//!
//! Clock, time code and active sensing are dropped in the callback so
//! they never reach the routes or the message counters.

use std::sync::mpsc;

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::info;

use super::MidiMessage;
use crate::error::{Error, Result};
use crate::routing::{OutputSink, QueueInput};

const CLIENT_NAME: &str = "velocurve";

/// An open input port. Keep it alive for as long as its stream is read.
pub struct InputConnection {
    name: String,
    _conn: MidiInputConnection<()>,
}

impl InputConnection {
    pub fn port_name(&self) -> &str {
        &self.name
    }
}

/// Open the first input port whose name contains `fragment`.
pub fn open_input(fragment: &str) -> Result<(InputConnection, QueueInput)> {
    let mut midi_in = MidiInput::new(CLIENT_NAME)?;
    midi_in.ignore(Ignore::None);

    let ports = midi_in.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_in.port_name(p).unwrap_or_default())
        .collect();
    let index = find_port(&names, fragment).ok_or_else(|| not_found("input", fragment, &names))?;
    let name = names[index].clone();

    let (sender, receiver) = mpsc::channel::<Vec<u8>>();
    let conn = midi_in.connect(
        &ports[index],
        "velocurve-input",
        move |_stamp, bytes, _| {
            if is_timing(bytes) {
                return;
            }
            // The receiver is gone once the route has exited
            let _ = sender.send(bytes.to_vec());
        },
        (),
    )?;

    info!(port = %name, "opened input port");
    Ok((
        InputConnection {
            name: name.clone(),
            _conn: conn,
        },
        QueueInput::from_receiver(name, receiver),
    ))
}

/// System real-time and time code messages that carry no musical content.
fn is_timing(bytes: &[u8]) -> bool {
    matches!(bytes.first(), Some(0xF1 | 0xF8 | 0xF9 | 0xFE))
}

/// Output sink writing to a hardware port.
pub struct MidiOutputSink {
    name: String,
    conn: MidiOutputConnection,
}

impl MidiOutputSink {
    /// Open the first output port whose name contains `fragment`.
    pub fn open(fragment: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;
        let ports = midi_out.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|p| midi_out.port_name(p).unwrap_or_default())
            .collect();
        let index =
            find_port(&names, fragment).ok_or_else(|| not_found("output", fragment, &names))?;
        let name = names[index].clone();

        let conn = midi_out.connect(&ports[index], "velocurve-output")?;

        info!(port = %name, "opened output port");
        Ok(Self { name, conn })
    }

    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl OutputSink for MidiOutputSink {
    fn send(&mut self, msg: &MidiMessage) -> Result<()> {
        self.conn.send(&msg.to_bytes())?;
        Ok(())
    }
}

/// List available MIDI input ports.
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new(CLIENT_NAME)?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect())
}

/// List available MIDI output ports.
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// Index of the first name containing `fragment`, ignoring case.
pub fn find_port(names: &[String], fragment: &str) -> Option<usize> {
    if fragment.is_empty() {
        return None;
    }
    let needle = fragment.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&needle))
}

fn not_found(direction: &str, fragment: &str, names: &[String]) -> Error {
    Error::Device(format!(
        "no {} port matching '{}' (available: {})",
        direction,
        fragment,
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec![
            "Midi Through:Midi Through Port-0 14:0".to_string(),
            "KOMPLETE KONTROL M32:KOMPLETE KONTROL M32 MIDI 1 20:0".to_string(),
            "MPK mini 3:MPK mini 3 MIDI 1 24:0".to_string(),
        ]
    }

    #[test]
    fn test_find_port_by_fragment() {
        assert_eq!(find_port(&names(), "KOMPLETE"), Some(1));
        assert_eq!(find_port(&names(), "mpk MINI"), Some(2));
        assert_eq!(find_port(&names(), "U2MIDI"), None);
    }

    #[test]
    fn test_empty_fragment_matches_nothing() {
        assert_eq!(find_port(&names(), ""), None);
    }

    #[test]
    fn test_not_found_lists_ports() {
        let err = not_found("output", "U2MIDI", &names());
        let text = err.to_string();
        assert!(text.contains("U2MIDI"));
        assert!(text.contains("MPK mini 3"));

        let none = not_found("input", "x", &[]).to_string();
        assert!(none.contains("available: none"));
    }

    #[test]
    fn test_timing_messages_dropped() {
        assert!(is_timing(&[0xF8]));
        assert!(is_timing(&[0xFE]));
        assert!(is_timing(&[0xF1, 0x20]));

        assert!(!is_timing(&[0x90, 60, 100]));
        assert!(!is_timing(&[0xF0, 0x7E, 0xF7]));
        assert!(!is_timing(&[0xFA]));
        assert!(!is_timing(&[]));
    }
}
