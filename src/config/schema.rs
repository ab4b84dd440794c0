//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::curve::{CurvePoint, VelocityCurve, VelocityCurveConfig};
use crate::engine::EngineConfig;
use crate::routing::{ChannelControl, DEFAULT_CHANNEL, DEFAULT_FILTER_CONTROL, MAX_CHANNEL, POLL_INTERVAL};

/// Main configuration for velocurve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocurveConfig {
    /// Which ports to open
    #[serde(default)]
    pub devices: DeviceConfig,

    /// Velocity curve
    #[serde(default)]
    pub curve: CurveSettings,

    /// How the output channel is chosen
    #[serde(default)]
    pub channel: ChannelSettings,

    /// Control number that is never forwarded (default: 65)
    #[serde(default = "default_filter_control")]
    pub filter_control: u8,

    /// Seconds between statistics lines, 0 to disable (default: 5)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,

    /// Log every adjustment
    #[serde(default)]
    pub debug: bool,
}

fn default_filter_control() -> u8 { DEFAULT_FILTER_CONTROL }
fn default_stats_interval() -> u64 { 5 }

impl Default for VelocurveConfig {
    fn default() -> Self {
        Self {
            devices: DeviceConfig::default(),
            curve: CurveSettings::default(),
            channel: ChannelSettings::default(),
            filter_control: default_filter_control(),
            stats_interval_secs: default_stats_interval(),
            debug: false,
        }
    }
}

impl VelocurveConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.devices.input.trim().is_empty() {
            bail!("An input device name is required");
        }
        if self.devices.output.trim().is_empty() {
            bail!("An output device name is required");
        }
        if self.filter_control > 127 {
            bail!("filter_control must be between 0 and 127");
        }
        if self.channel.mechanism == MechanismKind::ControlPort && self.devices.control.is_none() {
            bail!("Channel mechanism 'control_port' needs devices.control");
        }
        if self.channel.mechanism != MechanismKind::ControlPort
            && self.channel.mechanism != MechanismKind::Auto
            && self.devices.control.is_some()
        {
            bail!(
                "devices.control is set but channel mechanism is '{}'",
                self.channel.mechanism.name()
            );
        }

        self.curve.to_curve_config()?;
        self.channel_control().validate()?;
        if self.channel.initial > MAX_CHANNEL {
            bail!("Initial channel must be between 0 and 15");
        }
        Ok(())
    }

    /// The channel mechanism after resolving `auto`.
    pub fn channel_control(&self) -> ChannelControl {
        self.channel.resolve(self.devices.control.is_some())
    }

    /// Build the engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            curve: self.curve.to_curve_config()?,
            channel_control: self.channel_control(),
            initial_channel: self.channel.initial,
            filter_control: self.filter_control,
            stats_interval: match self.stats_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            poll_interval: POLL_INTERVAL,
        })
    }
}

/// Port name fragments (matched case-insensitively)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Keyboard to read notes from
    #[serde(default)]
    pub input: String,

    /// Synth to send to
    #[serde(default)]
    pub output: String,

    /// Optional second controller that selects the channel
    pub control: Option<String>,
}

/// Curve types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Linear,
    Exponential,
    /// Quadratic Bezier (default)
    #[default]
    Bezier,
    Custom,
}

/// Velocity curve settings. Each curve reads only the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveSettings {
    /// Curve type (default: bezier)
    #[serde(rename = "type", default)]
    pub kind: CurveKind,

    /// Bezier deviation (-100..100) or exponential power (default: 0.6)
    #[serde(default = "default_exponent")]
    pub exponent: f64,

    /// Linear multiplier (default: 1.0)
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// Reference velocity for linear and exponential (default: 127)
    #[serde(default = "default_max_value")]
    pub max_value: f64,

    /// Velocities at or below this are left alone (default: 0)
    #[serde(default)]
    pub threshold: u8,

    /// Breakpoints for the custom curve
    #[serde(default)]
    pub points: Vec<CurvePoint>,
}

fn default_exponent() -> f64 { 0.6 }
fn default_sensitivity() -> f64 { 1.0 }
fn default_max_value() -> f64 { crate::curve::DEFAULT_MAX_VALUE }

impl Default for CurveSettings {
    fn default() -> Self {
        Self {
            kind: CurveKind::default(),
            exponent: default_exponent(),
            sensitivity: default_sensitivity(),
            max_value: default_max_value(),
            threshold: 0,
            points: Vec::new(),
        }
    }
}

impl CurveSettings {
    pub fn to_curve(&self) -> VelocityCurve {
        match self.kind {
            CurveKind::Linear => VelocityCurve::Linear {
                sensitivity: self.sensitivity,
                max_value: self.max_value,
            },
            CurveKind::Exponential => VelocityCurve::Exponential {
                exponent: self.exponent,
                max_value: self.max_value,
            },
            CurveKind::Bezier => VelocityCurve::Bezier {
                deviation: self.exponent,
            },
            CurveKind::Custom => VelocityCurve::Custom {
                points: self.points.clone(),
            },
        }
    }

    /// Validated curve configuration
    pub fn to_curve_config(&self) -> Result<VelocityCurveConfig> {
        Ok(VelocityCurveConfig::new(self.to_curve(), self.threshold)?)
    }
}

/// Channel mechanism selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MechanismKind {
    /// control_port when a control device is configured, primary_cc otherwise
    #[default]
    Auto,
    /// Program changes on the control device
    ControlPort,
    /// A control change on the main input
    PrimaryCc,
    /// Channel never changes
    None,
}

impl MechanismKind {
    pub fn name(&self) -> &'static str {
        match self {
            MechanismKind::Auto => "auto",
            MechanismKind::ControlPort => "control_port",
            MechanismKind::PrimaryCc => "primary_cc",
            MechanismKind::None => "none",
        }
    }
}

/// Output channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(default)]
    pub mechanism: MechanismKind,

    /// Channel until told otherwise, 0-15 (default: 1)
    #[serde(default = "default_initial_channel")]
    pub initial: u8,

    /// control_port: channel = program - offset (default: 1)
    #[serde(default = "default_program_offset")]
    pub program_offset: u8,

    /// primary_cc: trigger control number (default: 94)
    #[serde(default = "default_channel_cc")]
    pub control: u8,

    /// primary_cc: lowest accepted value (default: 1)
    #[serde(default = "default_min_value")]
    pub min_value: u8,

    /// primary_cc: highest accepted value (default: 15)
    #[serde(default = "default_max_channel_value")]
    pub max_value: u8,
}

fn default_initial_channel() -> u8 { DEFAULT_CHANNEL }
fn default_program_offset() -> u8 { ChannelControl::DEFAULT_PROGRAM_OFFSET }
fn default_channel_cc() -> u8 { ChannelControl::DEFAULT_CONTROL }
fn default_min_value() -> u8 { 1 }
fn default_max_channel_value() -> u8 { MAX_CHANNEL }

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            mechanism: MechanismKind::default(),
            initial: default_initial_channel(),
            program_offset: default_program_offset(),
            control: default_channel_cc(),
            min_value: default_min_value(),
            max_value: default_max_channel_value(),
        }
    }
}

impl ChannelSettings {
    pub fn resolve(&self, has_control_device: bool) -> ChannelControl {
        let kind = match self.mechanism {
            MechanismKind::Auto if has_control_device => MechanismKind::ControlPort,
            MechanismKind::Auto => MechanismKind::PrimaryCc,
            other => other,
        };
        match kind {
            MechanismKind::ControlPort => ChannelControl::ControlPort {
                program_offset: self.program_offset,
            },
            MechanismKind::PrimaryCc => ChannelControl::PrimaryCc {
                control: self.control,
                min_value: self.min_value,
                max_value: self.max_value,
            },
            _ => ChannelControl::Fixed,
        }
    }
}
