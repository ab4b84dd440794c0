//! MIDI messages and hardware ports.

mod device;
mod message;

pub use device::{
    find_port, list_input_ports, list_output_ports, open_input, InputConnection, MidiOutputSink,
};
pub use message::MidiMessage;
