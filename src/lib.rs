//! velocurve - real-time MIDI velocity curves and channel routing
//!
//! Sits between a keyboard and a synth. Note velocities are reshaped by a
//! configurable curve and notes are sent on a channel that a second
//! controller (or a control change on the keyboard itself) can switch.

pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod midi;
pub mod routing;

pub use config::VelocurveConfig;
pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};
